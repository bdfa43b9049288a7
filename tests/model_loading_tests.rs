use rustmemodb_archive::{
    Capability, Catalog, DataType, DbError, InMemoryStore, JsonModelLoader, MirroringMigrator, ModelLoader,
    ModelRegistry, Record, RecordStore, Value, table_block,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, contents: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

fn models_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "post.json",
        r#"{
            "name": "Post",
            "table": "posts",
            "undestroy": {
                "fields": [
                    {"name": "deleted_at", "type": "datetime", "producer": "now"},
                    {"name": "title_was", "type": "string", "producer": {"source": "title"}}
                ]
            }
        }"#,
    );
    write(
        dir.path(),
        "nested/comments.json",
        r#"[
            {"name": "Comment", "table": "comments", "undestroy": {"target": "CommentGraveyard"}},
            {"name": "CommentGraveyard", "table": "dead_comments", "capabilities": ["persistable", "restorable"]}
        ]"#,
    );
    write(dir.path(), "README.md", "not a model");
    dir
}

#[test]
fn test_loads_models_recursively() {
    let dir = models_dir();
    let models = ModelRegistry::new(Arc::new(Catalog::new()));

    let loaded = JsonModelLoader::new()
        .load_models(&[dir.path().to_path_buf()], &models)
        .unwrap();
    assert_eq!(loaded, 3);

    let post = models.binding("Post").unwrap().unwrap();
    assert_eq!(post.archive_type().table_name(), Some("archive_posts"));
    assert!(post.config().is_managed_field("title_was"));

    let comment = models.binding("Comment").unwrap().unwrap();
    assert_eq!(comment.archive_type().name(), "CommentGraveyard");
    assert!(comment.archive_type().has_capability(Capability::Restorable));
    assert!(models.entity_type("PostArchive").unwrap().is_some());
}

#[test]
fn test_second_load_skips_known_files() {
    let dir = models_dir();
    let models = ModelRegistry::new(Arc::new(Catalog::new()));
    let loader = JsonModelLoader::new();
    let paths = [dir.path().to_path_buf()];

    loader.load_models(&paths, &models).unwrap();
    assert_eq!(loader.load_models(&paths, &models).unwrap(), 0);
    assert_eq!(models.catalog().len().unwrap(), 2);
}

#[test]
fn test_invalid_file_is_parse_error() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "broken.json", r#"{"table": "posts"}"#);
    let models = ModelRegistry::new(Arc::new(Catalog::new()));

    let err = JsonModelLoader::new()
        .load_models(&[dir.path().to_path_buf()], &models)
        .unwrap_err();
    assert!(matches!(err, DbError::ParseError(_)));
}

#[test]
fn test_migrator_loads_models_from_default_paths() {
    let dir = models_dir();
    let catalog = Arc::new(Catalog::new());
    catalog
        .configure(|defaults| defaults.model_paths = vec![dir.path().to_path_buf()])
        .unwrap();
    let models = ModelRegistry::new(catalog);
    let loader = JsonModelLoader::new();

    let mut migrator = MirroringMigrator::new(InMemoryStore::new(), &models).with_loader(&loader);
    migrator
        .create_table(
            "posts",
            table_block(|t| {
                t.string("title");
            }),
        )
        .unwrap();
    let mut store = migrator.into_inner();

    assert_eq!(
        store.table("archive_posts").unwrap().schema().column_names(),
        vec!["id", "title", "deleted_at", "title_was"]
    );

    let binding = models.binding("Post").unwrap().unwrap();
    let mut post = Record::build(binding.model().clone(), [("title".to_string(), Value::from("Hi"))]).unwrap();
    store.insert(&mut post).unwrap();
    models.destroy(&mut post, &mut store).unwrap();

    let archived = store.find(binding.archive_type(), &Default::default()).unwrap();
    assert_eq!(archived[0].get("title_was"), Some(&Value::from("Hi")));
    assert_eq!(
        store.table("archive_posts").unwrap().schema().schema().get_column("title_was").unwrap().data_type,
        DataType::String
    );
}

#[test]
fn test_failed_batch_registers_nothing_and_can_be_retried() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a_post.json", r#"{"name": "Post", "table": "posts", "undestroy": {}}"#);
    write(dir.path(), "b_post.json", r#"{"name": "Post", "table": "posts_again"}"#);
    let models = ModelRegistry::new(Arc::new(Catalog::new()));
    let loader = JsonModelLoader::new();
    let paths = [dir.path().to_path_buf()];

    let err = loader.load_models(&paths, &models).unwrap_err();
    assert!(matches!(err, DbError::InvalidArgument(_)));
    assert!(models.entity_type("Post").unwrap().is_none());
    assert!(models.binding("Post").unwrap().is_none());
    assert!(models.catalog().is_empty().unwrap());
    assert!(!models.is_loaded(&dir.path().join("a_post.json")).unwrap());

    write(dir.path(), "b_post.json", r#"{"name": "Page", "table": "pages"}"#);
    assert_eq!(loader.load_models(&paths, &models).unwrap(), 2);
    assert!(models.binding("Post").unwrap().is_some());
    assert_eq!(models.catalog().len().unwrap(), 1);
}

#[test]
fn test_failed_binding_leaves_types_unregistered() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "post.json",
        r#"[
            {"name": "Post", "table": "posts", "undestroy": {"target": "Shelf"}},
            {"name": "Shelf", "capabilities": []}
        ]"#,
    );
    let models = ModelRegistry::new(Arc::new(Catalog::new()));

    let err = JsonModelLoader::new()
        .load_models(&[dir.path().to_path_buf()], &models)
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidArgument(_)));
    assert!(models.types().unwrap().is_empty());
    assert!(models.catalog().is_empty().unwrap());
}

#[test]
fn test_datetime_constant_is_archived_as_timestamp() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "post.json",
        r#"{
            "name": "Post",
            "table": "posts",
            "undestroy": {
                "fields": [{"name": "purge_after", "type": "datetime", "value": "2030-01-01T00:00:00Z"}]
            }
        }"#,
    );
    let models = ModelRegistry::new(Arc::new(Catalog::new()));
    let loader = JsonModelLoader::new();
    loader.load_models(&[dir.path().to_path_buf()], &models).unwrap();

    let mut migrator = MirroringMigrator::new(InMemoryStore::new(), &models);
    migrator
        .create_table(
            "posts",
            table_block(|t| {
                t.string("title");
            }),
        )
        .unwrap();
    let mut store = migrator.into_inner();

    let binding = models.binding("Post").unwrap().unwrap();
    let mut post = Record::build(binding.model().clone(), [("title".to_string(), Value::from("Hi"))]).unwrap();
    store.insert(&mut post).unwrap();
    assert!(models.destroy(&mut post, &mut store).unwrap());

    let archived = store.find(binding.archive_type(), &Default::default()).unwrap();
    let purge_after = archived[0].get("purge_after").and_then(Value::as_timestamp).unwrap();
    assert_eq!(purge_after.to_rfc3339(), "2030-01-01T00:00:00+00:00");
}
