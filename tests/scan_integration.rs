use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

use treedoc::config::{Config, OutputFormat, ScanConfig};
use treedoc::core::{Engine, GenerateOptions, ScanResult, Scanner};

const MODELS_PY: &str = r#"
class Item(Base):
    name: str
    price: float = 0.0

    def total(self, qty: int) -> float:
        return self.price * qty
"#;

const UTIL_PY: &str = r#"
def slugify(text: str) -> str:
    """Make a slug.

    Lowercases and joins words.
    """
    return text
"#;

const CART_JS: &str = "export const addItem = (cart, item) => cart.concat(item);\n";

/// `shop/` with one ignored dependency folder and a directory holding nothing shown
fn shop_fixture() -> TempDir {
    let temp = TempDir::new().unwrap();
    let shop = temp.child("shop");
    shop.child("README.md").write_str("# Shop\n").unwrap();
    shop.child("package.json").write_str("{}\n").unwrap();
    shop.child("app/__init__.py").write_str("").unwrap();
    shop.child("app/models.py").write_str(MODELS_PY).unwrap();
    shop.child("app/util.py").write_str(UTIL_PY).unwrap();
    shop.child("web/cart.js").write_str(CART_JS).unwrap();
    shop.child("web/notes.txt").write_str("todo\n").unwrap();
    shop.child("docs/scratch.txt").write_str("draft\n").unwrap();
    shop.child("node_modules/left-pad/index.js")
        .write_str("function leftPad(s) { return s; }\n")
        .unwrap();
    shop.child("empty").create_dir_all().unwrap();
    temp
}

fn scan(root: &std::path::Path, config: &ScanConfig) -> ScanResult {
    Scanner::new(config).unwrap().scan(root).unwrap()
}

#[test]
fn test_golden_shop_fixture() {
    let temp = shop_fixture();
    let result = scan(temp.child("shop").path(), &ScanConfig::default());

    let expected_tree = "\
shop/
├── app/
│   ├── __init__.py
│   ├── models.py
│   └── util.py
├── web/
│   └── cart.js
├── README.md
└── package.json";
    assert_eq!(result.tree, expected_tree);

    assert_eq!(result.files_scanned, 4);
    assert!(result.failures.is_empty());

    assert_eq!(result.models.len(), 1);
    let item = &result.models[0];
    assert_eq!(item.name, "Item");
    assert_eq!(item.file, "app/models.py");
    assert_eq!(item.base_classes, vec!["Base"]);
    assert_eq!(item.methods, vec!["total"]);
    assert_eq!(item.fields.len(), 2);
    assert_eq!(item.fields[1].name, "price");
    assert_eq!(item.fields[1].default.as_deref(), Some("0.0"));

    let functions: Vec<(&str, &str)> = result
        .functions
        .iter()
        .map(|f| (f.file.as_str(), f.name.as_str()))
        .collect();
    assert_eq!(
        functions,
        vec![("app/util.py", "slugify"), ("web/cart.js", "addItem")]
    );

    let slugify = &result.functions[0];
    assert_eq!(slugify.returns.as_deref(), Some("str"));
    assert_eq!(slugify.docstring.as_deref(), Some("Make a slug."));

    let add_item = &result.functions[1];
    let params: Vec<&str> = add_item.params.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(params, vec!["cart", "item"]);
    assert_eq!(add_item.returns, None);
}

#[test]
fn test_scan_is_idempotent() {
    let temp = shop_fixture();
    let root = temp.child("shop");

    let first = scan(root.path(), &ScanConfig::default());
    let second = scan(root.path(), &ScanConfig::default());
    assert_eq!(first, second);
}

#[test]
fn test_broken_files_fail_locally() {
    let temp = TempDir::new().unwrap();
    temp.child("good.py").write_str("def fine():\n    pass\n").unwrap();
    temp.child("bad.py").write_str("def broken(:\n    pass\n").unwrap();
    temp.child("bad.js").write_str("function open() {\n").unwrap();
    temp.child("good.js").write_str("function ok() {}\n").unwrap();

    let result = scan(temp.path(), &ScanConfig::default());

    let names: Vec<&str> = result.functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["ok", "fine"]);

    let failed: Vec<&str> = result.failures.iter().map(|f| f.file.as_str()).collect();
    assert_eq!(failed, vec!["bad.js", "bad.py"]);
    assert_eq!(result.files_scanned, 4);

    // A broken file is still part of the tree
    assert!(result.tree.contains("bad.py"));
}

#[test]
fn test_more_ignore_patterns_never_add_entities() {
    let temp = shop_fixture();
    let root = temp.child("shop");

    let base = scan(root.path(), &ScanConfig::default());
    let narrowed = scan(
        root.path(),
        &ScanConfig {
            exclude_patterns: vec!["web".to_string()],
            ..ScanConfig::default()
        },
    );

    assert!(narrowed.functions.len() < base.functions.len());
    assert!(narrowed
        .functions
        .iter()
        .all(|f| base.functions.contains(f)));
    assert!(narrowed.models.iter().all(|m| base.models.contains(m)));
    assert!(!narrowed.tree.contains("web/"));
    assert_eq!(narrowed.tree.lines().count(), base.tree.lines().count() - 2);
}

#[cfg(unix)]
#[test]
fn test_unreadable_directory_is_skipped() {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    temp.child("open/a.py").write_str("def visible():\n    pass\n").unwrap();
    temp.child("locked/b.py").write_str("def hidden():\n    pass\n").unwrap();

    let locked = temp.child("locked");
    fs::set_permissions(locked.path(), fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read_dir(locked.path()).is_ok() {
        // Permission bits do not bind this user (e.g. root)
        fs::set_permissions(locked.path(), fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let result = Scanner::new(&ScanConfig::default())
        .unwrap()
        .scan(temp.path());
    fs::set_permissions(locked.path(), fs::Permissions::from_mode(0o755)).unwrap();

    let result = result.unwrap();
    let names: Vec<&str> = result.functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["visible"]);
    assert!(!result.tree.contains("locked"));
}

#[test]
fn test_generate_writes_markdown() {
    let temp = shop_fixture();
    let root = temp.child("shop");

    let mut engine = Engine::with_config(Config::default());
    let (result, output) = engine
        .generate(root.path(), GenerateOptions::default())
        .unwrap();

    assert_eq!(output, root.path().join("TECHNICAL_DOCS.md"));
    assert_eq!(result.models.len(), 1);

    let docs = std::fs::read_to_string(root.child("TECHNICAL_DOCS.md").path()).unwrap();
    let expected = [
        "*Auto-generated from: shop*",
        "### app/models.py",
        "| `price` | `float` | `0.0` |",
        "#### `slugify(text: str)`",
        "#### `addItem(cart, item)`",
        "*Returns: `unknown`*",
    ];
    assert!(predicate::str::starts_with("# Technical Documentation").eval(&docs));
    for fragment in expected {
        assert!(predicate::str::contains(fragment).eval(&docs), "missing {fragment}");
    }
    assert!(predicate::str::contains("leftPad").not().eval(&docs));
}

#[test]
fn test_generate_json_with_cli_overrides() {
    let temp = shop_fixture();
    let root = temp.child("shop");

    let mut engine = Engine::with_config(Config::default());
    let options = GenerateOptions {
        output: Some("docs.json".into()),
        exclude: vec!["app".to_string()],
        format: Some(OutputFormat::Json),
        ..GenerateOptions::default()
    };
    engine.generate(root.path(), options).unwrap();

    let json = std::fs::read_to_string(root.child("docs.json").path()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["models"].as_array().unwrap().len(), 0);
    assert_eq!(value["functions"][0]["name"], "addItem");
    assert_eq!(value["files_scanned"], 1);
}

#[test]
fn test_include_patterns_extend_the_tree() {
    let temp = shop_fixture();
    let root = temp.child("shop");

    let mut engine = Engine::with_config(Config::default());
    let options = GenerateOptions {
        include: vec!["*.txt".to_string()],
        ..GenerateOptions::default()
    };
    let (result, _) = engine.generate(root.path(), options).unwrap();

    assert!(result.tree.contains("│   ├── cart.js\n│   └── notes.txt"));
    assert!(result.tree.contains("├── docs/\n│   └── scratch.txt"));
    // Shown, but there is no extractor for them
    assert_eq!(result.files_scanned, 4);
}

#[test]
fn test_missing_root_is_an_error() {
    let temp = TempDir::new().unwrap();
    let mut engine = Engine::with_config(Config::default());
    assert!(engine
        .generate(&temp.path().join("missing"), GenerateOptions::default())
        .is_err());
}
