use pretty_assertions::assert_eq;
use schemata::MergeConfig;
use schemata::MergeOptions;
use schemata::Resolver;
use schemata::ResolverCall;
use schemata::ResolverMap;
use schemata::Schemata;
use serde_json::json;

fn people() -> Schemata {
    Schemata::new("type Person{name:String} type Query{peep:Person}")
        .unwrap()
        .with_resolvers(
            ResolverMap::new().with("peep", Resolver::from_fn(|_| Ok(json!({ "name": "Sally" })))),
        )
}

fn genders() -> Schemata {
    Schemata::new("enum Gender{Male Female} type Person{gender:Gender}").unwrap()
}

#[tokio::test]
async fn merged_person_keeps_its_resolvers() {
    let merged = people().merge(&genders(), &MergeOptions::default()).unwrap();
    let executable = merged.schema().unwrap();
    let schema = executable.schema();

    let person = schema.get_object("Person").unwrap();
    assert_eq!(
        person.fields.keys().map(|name| name.as_str()).collect::<Vec<_>>(),
        vec!["name", "gender"]
    );
    assert!(schema.get_enum("Gender").is_some());

    let peep = executable
        .resolve("Query", "peep", ResolverCall::default())
        .await
        .unwrap();
    assert_eq!(peep, json!({ "name": "Sally" }));

    let name = executable
        .resolve("Person", "name", ResolverCall::new("Person", "name").with_parent(peep))
        .await
        .unwrap();
    assert_eq!(name, json!("Sally"));
}

#[tokio::test]
async fn merge_order_does_not_lose_resolvers() {
    let config = MergeConfig::from_yaml("create_missing_resolvers: true").unwrap();
    let merged = genders().merge(&people(), &config.into()).unwrap();
    let executable = merged.schema().unwrap();
    let peep = executable
        .resolve("Query", "peep", ResolverCall::default())
        .await
        .unwrap();
    assert_eq!(peep, json!({ "name": "Sally" }));
    assert!(executable.resolver("Person", "gender").is_some());
}
