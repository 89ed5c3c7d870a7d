use schemata::ConflictResolvers;
use schemata::GraphQLModule;
use schemata::MergeOptions;
use schemata::Resolver;
use schemata::ResolverCall;
use schemata::ResolverMap;
use schemata::SchemataError;
use serde_json::json;

fn write(dir: &tempfile::TempDir, file: &str, sdl: &str) -> std::path::PathBuf {
    let path = dir.path().join(file);
    std::fs::write(&path, sdl).unwrap();
    path
}

#[tokio::test]
async fn loaded_modules_merge() {
    let dir = tempfile::tempdir().unwrap();
    let people = write(&dir, "people.graphql", "type Person { name: String }\ntype Query { peep: Person }\n");
    let genders = write(&dir, "genders.gql", "enum Gender { Male Female }\ntype Person { gender: Gender }\n");

    let people = GraphQLModule::load(
        people,
        Some(ResolverMap::new().with("peep", Resolver::constant(json!({ "name": "Sally" })))),
    )
    .unwrap();
    let genders = GraphQLModule::load(genders, None).unwrap();
    assert!(people.type_defs.ends_with('\n'));
    assert!(!people.sdl.ends_with('\n'));

    let merged = people
        .schemata
        .merge(&genders.schemata, &MergeOptions::default())
        .unwrap();
    let schema = merged.schema().unwrap();
    assert!(schema.schema().type_field("Person", "gender").is_ok());
    let peep = schema
        .resolve("Query", "peep", ResolverCall::default())
        .await
        .unwrap();
    assert_eq!(peep, json!({ "name": "Sally" }));

    let sdl_only = people
        .schemata
        .merge_sdl(&genders, &ConflictResolvers::default())
        .unwrap();
    assert!(sdl_only.resolvers().is_none());
    assert!(sdl_only.is_valid_schema());
}

#[test]
fn unrecognised_extensions_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "people.txt", "type Person { name: String }");
    let error = GraphQLModule::load(&path, None).unwrap_err();
    let SchemataError::ModuleLoad { reason, .. } = error else {
        panic!("unexpected error: {error}");
    };
    assert!(reason.contains(".graphql"));
}

#[test]
fn missing_files_fail_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let error = GraphQLModule::load(dir.path().join("absent.sdl"), None).unwrap_err();
    assert!(matches!(error, SchemataError::ModuleLoad { .. }));
}
