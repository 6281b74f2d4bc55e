//! End-to-end generation over a canonical package on disk

use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use verso_codegen::{
    generate_code_for_versioned_packages, generate_code_with_plugins, CanonicalTree,
    ClassRebuildingPlugin, ClassRenamingPlugin, FnPlugin, GenerationError, Generator,
    HeadImportRewritingPlugin, ImportAutoAddingPlugin, MigrationChain, Node, Pipeline,
    AUTO_GENERATION_WARNING,
};
use verso_registry::{Instruction, VersionBundle};
use verso_syntax::NodeKind;
use verso_test_utils::{bundle, bundle_with_head, change, init_tracing, path, version, CanonicalFixture};

const MODELS: &str = "\
from pydantic import BaseModel, field_validator


class Widget(BaseModel):
    name: str
    size: int

    @field_validator(\"name\", \"size\")
    @classmethod
    def check(cls, value):
        return value
";

const API: &str = "\
from pkg.head.models import Widget


def make() -> Widget:
    return Widget(name=\"x\", size=1)
";

const SCHEMA_JSON: &[u8] = b"{\"type\": \"object\"}\n";

fn fixture() -> CanonicalFixture {
    init_tracing();
    let fixture = CanonicalFixture::new();
    fixture
        .write("models.py", MODELS)
        .write("api.py", API)
        .write_bytes("data/schema.json", SCHEMA_JSON)
        .write_bytes("__pycache__/models.cpython-312.pyc", b"\x00\x01");
    fixture
}

fn rename_widget() -> Instruction {
    Instruction::SchemaHad {
        schema: path("pkg.head.models.Widget"),
        name: "Gadget".into(),
    }
}

fn drop_size() -> Instruction {
    Instruction::FieldDidntExist {
        schema: path("pkg.head.models.Widget"),
        field: "size".into(),
    }
}

/// v3 renames Widget to Gadget for v2, v2 drops `size` for v1
fn history() -> VersionBundle {
    bundle(vec![
        version("2003-01-01", vec![change("Rename Widget to Gadget", vec![rename_widget()])]),
        version("2002-01-01", vec![change("Drop Widget.size", vec![drop_size()])]),
        version("2001-01-01", vec![]),
    ])
}

fn generate(fixture: &CanonicalFixture, bundle: &VersionBundle) {
    let tree = CanonicalTree::discover(fixture.root()).unwrap();
    Generator::default().generate(&tree, bundle).unwrap();
}

#[test]
fn rename_propagates_to_older_versions() {
    let fixture = fixture();
    generate(&fixture, &history());

    let v3 = fixture.read_version("v2003_01_01", "models.py");
    assert_eq!(v3, format!("{AUTO_GENERATION_WARNING}{MODELS}"));
    assert_eq!(
        fixture.read_version("v2003_01_01", "api.py"),
        format!(
            "{AUTO_GENERATION_WARNING}from pkg.v2003_01_01.models import Widget\n\n\ndef make() -> Widget:\n    return Widget(name=\"x\", size=1)\n"
        )
    );

    for dir in ["v2002_01_01", "v2001_01_01"] {
        let models = fixture.read_version(dir, "models.py");
        assert!(models.contains("class Gadget(BaseModel):"), "{dir}: {models}");
        assert!(!models.contains("Widget"), "{dir}: {models}");

        let api = fixture.read_version(dir, "api.py");
        assert!(api.contains(&format!("from pkg.{dir}.models import Gadget\n")), "{dir}: {api}");
        assert!(api.contains("def make() -> Gadget:\n    return Gadget("), "{dir}: {api}");
    }
}

#[test]
fn removed_field_disappears_from_older_versions() {
    let fixture = fixture();
    generate(&fixture, &history());

    assert!(fixture.read_version("v2003_01_01", "models.py").contains("    size: int\n"));
    assert!(fixture.read_version("v2002_01_01", "models.py").contains("    size: int\n"));
    assert_eq!(
        fixture.read_version("v2001_01_01", "models.py"),
        format!(
            "{AUTO_GENERATION_WARNING}\
from pydantic import BaseModel, field_validator


class Gadget(BaseModel):
    name: str

    @field_validator(\"name\")
    @classmethod
    def check(cls, value):
        return value
"
        )
    );
}

#[test]
fn field_removed_in_newest_version_is_absent_from_all_older_ones() {
    let fixture = fixture();
    let bundle = bundle(vec![
        version("2003-01-01", vec![change("Drop Widget.size", vec![drop_size()])]),
        version("2002-01-01", vec![]),
        version("2001-01-01", vec![]),
    ]);
    generate(&fixture, &bundle);

    assert!(fixture.read_version("v2003_01_01", "models.py").contains("    size: int\n"));
    for dir in ["v2002_01_01", "v2001_01_01"] {
        let models = fixture.read_version(dir, "models.py");
        assert!(!models.contains("size"), "{dir}: {models}");
        assert!(models.contains("    @field_validator(\"name\")\n"), "{dir}: {models}");
    }
}

#[test]
fn head_changes_apply_before_the_newest_version() {
    let fixture = fixture();
    let bundle = bundle_with_head(
        vec![change("Hide Widget.size", vec![drop_size()])],
        vec![version("2002-01-01", vec![]), version("2001-01-01", vec![])],
    );
    generate(&fixture, &bundle);

    for dir in ["v2002_01_01", "v2001_01_01"] {
        let models = fixture.read_version(dir, "models.py");
        assert!(!models.contains("size"), "{dir}: {models}");
        assert!(models.contains("class Widget(BaseModel):\n    name: str\n"), "{dir}: {models}");
    }
}

#[test]
fn inconsistent_head_change_writes_nothing() {
    let fixture = fixture();
    let bundle = bundle_with_head(
        vec![change(
            "Hide a field that never existed",
            vec![Instruction::FieldDidntExist {
                schema: path("pkg.head.models.Widget"),
                field: "colour".into(),
            }],
        )],
        vec![version("2002-01-01", vec![]), version("2001-01-01", vec![])],
    );

    let tree = CanonicalTree::discover(fixture.root()).unwrap();
    let err = Generator::default().generate(&tree, &bundle).unwrap_err();
    assert!(matches!(err, GenerationError::Registry { ref version, .. } if version == "head"));
    for dir in ["v2002_01_01", "v2001_01_01"] {
        assert!(!fixture.version_dir(dir).exists(), "{dir} was written");
    }
}

#[test]
fn registry_is_threaded_newest_first() {
    let fixture = fixture();
    let seen: Arc<Mutex<Vec<(String, String, Vec<String>)>>> = Arc::default();
    let recorder = {
        let seen = Arc::clone(&seen);
        FnPlugin::new("recorder", &[NodeKind::ClassDef], move |node, context| {
            assert_eq!(context.global.extra.get("tenant"), Some(&serde_json::json!("acme")));
            if let Some(schema) = context.registry.schema(&path("pkg.head.models.Widget")) {
                seen.lock().unwrap().push((
                    context.global.current_version.value.clone(),
                    schema.name.clone(),
                    schema.fields.iter().map(|f| f.name.clone()).collect(),
                ));
            }
            Ok(node)
        })
    };

    let tree = CanonicalTree::discover(fixture.root()).unwrap();
    Generator::default()
        .with_pipeline(Pipeline::with_defaults().with(recorder))
        .with_extra("tenant", serde_json::json!("acme"))
        .generate(&tree, &history())
        .unwrap();

    let fields = |names: &[&str]| names.iter().map(|n| (*n).to_string()).collect::<Vec<_>>();
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            ("2003-01-01".to_string(), "Widget".to_string(), fields(&["name", "size"])),
            ("2002-01-01".to_string(), "Gadget".to_string(), fields(&["name", "size"])),
            ("2001-01-01".to_string(), "Gadget".to_string(), fields(&["name"])),
        ]
    );
}

#[test]
fn tree_is_mirrored_with_headers() {
    let fixture = fixture();
    generate(&fixture, &history());

    for dir in ["v2003_01_01", "v2002_01_01", "v2001_01_01"] {
        assert_eq!(
            fixture.list_version(dir),
            vec!["__init__.py", "api.py", "data/schema.json", "models.py"]
        );
        assert_eq!(
            std::fs::read(fixture.version_dir(dir).join("data").join("schema.json")).unwrap(),
            SCHEMA_JSON
        );
        for file in ["__init__.py", "api.py", "models.py"] {
            assert!(fixture.read_version(dir, file).starts_with(AUTO_GENERATION_WARNING));
        }
    }
    assert_eq!(fixture.read_version("v2001_01_01", "__init__.py"), AUTO_GENERATION_WARNING);
}

#[test]
fn generation_is_idempotent() {
    let fixture = fixture();
    let snapshot = || {
        let mut files = BTreeMap::new();
        for dir in ["v2003_01_01", "v2002_01_01", "v2001_01_01"] {
            for file in fixture.list_version(dir) {
                let bytes = std::fs::read(fixture.version_dir(dir).join(&file)).unwrap();
                files.insert(format!("{dir}/{file}"), bytes);
            }
        }
        files
    };

    generate(&fixture, &history());
    let first = snapshot();
    generate(&fixture, &history());
    assert_eq!(first, snapshot());
}

#[test]
fn rebuild_must_run_before_rename() {
    let fixture = fixture();
    let bundle = bundle(vec![
        version(
            "2002-01-01",
            vec![change("Rename and shrink", vec![rename_widget(), drop_size()])],
        ),
        version("2001-01-01", vec![]),
    ]);
    let tree = CanonicalTree::discover(fixture.root()).unwrap();

    Generator::default().generate(&tree, &bundle).unwrap();
    let default_order = fixture.read_version("v2001_01_01", "models.py");
    assert!(default_order.contains("class Gadget(BaseModel):\n    name: str\n\n"));
    assert!(!default_order.contains("size"));

    let reversed = Pipeline::new()
        .with(ClassRenamingPlugin)
        .with(ClassRebuildingPlugin)
        .with(ImportAutoAddingPlugin)
        .with(HeadImportRewritingPlugin);
    Generator::default()
        .with_pipeline(reversed)
        .generate(&tree, &bundle)
        .unwrap();
    let renamed_first = fixture.read_version("v2001_01_01", "models.py");
    assert!(renamed_first.contains("class Gadget(BaseModel):\n    name: str\n    size: int\n"));
    assert_ne!(default_order, renamed_first);
}

#[test]
fn inconsistent_history_writes_nothing() {
    let fixture = fixture();
    let bundle = bundle(vec![
        version("2003-01-01", vec![change("Rename Widget to Gadget", vec![rename_widget()])]),
        version(
            "2002-01-01",
            vec![change(
                "Drop a field that never existed",
                vec![Instruction::FieldDidntExist {
                    schema: path("pkg.head.models.Widget"),
                    field: "colour".into(),
                }],
            )],
        ),
        version("2001-01-01", vec![]),
    ]);

    let tree = CanonicalTree::discover(fixture.root()).unwrap();
    let err = Generator::default().generate(&tree, &bundle).unwrap_err();
    assert!(matches!(err, GenerationError::Registry { ref version, .. } if version == "2002-01-01"));
    assert!(err.to_string().contains("Drop a field that never existed"));

    for dir in ["v2003_01_01", "v2002_01_01", "v2001_01_01"] {
        assert!(!fixture.version_dir(dir).exists(), "{dir} was written");
    }
}

#[test]
fn deleted_module_is_not_emitted() {
    let fixture = fixture();
    let bundle = bundle(vec![
        version(
            "2002-01-01",
            vec![change(
                "Introduce api module",
                vec![Instruction::ModuleDidntExist { module: path("pkg.head.api") }],
            )],
        ),
        version("2001-01-01", vec![]),
    ]);
    generate(&fixture, &bundle);

    assert!(fixture.version_dir("v2002_01_01").join("api.py").exists());
    assert!(!fixture.version_dir("v2001_01_01").join("api.py").exists());
    assert!(fixture.version_dir("v2001_01_01").join("models.py").exists());
}

#[test]
fn added_field_brings_its_import() {
    let fixture = fixture();
    let bundle = bundle(vec![
        version(
            "2002-01-01",
            vec![change(
                "Price was a decimal",
                vec![Instruction::FieldExistedAs {
                    schema: path("pkg.head.models.Widget"),
                    field: "price".into(),
                    annotation: "Decimal".into(),
                    default: Some("Decimal(0)".into()),
                    import: Some(verso_registry::ImportRequirement::from_module("decimal", "Decimal")),
                }],
            )],
        ),
        version("2001-01-01", vec![]),
    ]);
    generate(&fixture, &bundle);

    let old = fixture.read_version("v2001_01_01", "models.py");
    assert!(old.contains("from pydantic import BaseModel, field_validator\nfrom decimal import Decimal\n"));
    assert!(old.contains("    size: int\n    price: Decimal = Decimal(0)\n"));
    assert!(!fixture.read_version("v2002_01_01", "models.py").contains("decimal"));
}

#[test]
fn missing_root_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let err = generate_code_for_versioned_packages(dir.path().join("missing"), &history()).unwrap_err();
    assert!(matches!(err, GenerationError::UnresolvableSource { .. }));
}

#[test]
fn entry_point_accepts_plugins_migrations_and_extra() {
    let fixture = fixture();
    let seen: Arc<Mutex<Vec<String>>> = Arc::default();
    let recorder = {
        let seen = Arc::clone(&seen);
        FnPlugin::new("recorder", &[NodeKind::ClassDef], move |node, context| {
            let tenant = context.global.extra.get("tenant").cloned().unwrap_or_default();
            seen.lock()
                .unwrap()
                .push(format!("{}:{tenant}", context.global.current_version.value));
            Ok(node)
        })
    };
    let extra = BTreeMap::from([("tenant".to_string(), serde_json::json!("acme"))]);

    generate_code_with_plugins(
        fixture.root(),
        &history(),
        Pipeline::with_defaults().with(recorder),
        MigrationChain::new(),
        extra,
    )
    .unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            "2003-01-01:\"acme\"".to_string(),
            "2002-01-01:\"acme\"".to_string(),
            "2001-01-01:\"acme\"".to_string(),
        ]
    );
    // no migrations, so every version matches the canonical models
    assert!(fixture.read_version("v2001_01_01", "models.py").contains("class Widget(BaseModel):"));
}

#[test]
fn entry_point_generates_sibling_packages() {
    let fixture = fixture();
    generate_code_for_versioned_packages(fixture.root(), &history()).unwrap();
    assert!(fixture.version_dir("v2001_01_01").join("models.py").exists());
}
