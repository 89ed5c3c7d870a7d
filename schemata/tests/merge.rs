use std::sync::Arc;

use pretty_assertions::assert_eq;
use rstest::rstest;
use schemata::CallShape;
use schemata::ConflictResolvers;
use schemata::MergeConfig;
use schemata::MergeOptions;
use schemata::Resolver;
use schemata::ResolverCall;
use schemata::ResolverInjector;
use schemata::ResolverMap;
use schemata::ScalarConfig;
use schemata::Schemata;
use serde_json::Value;
use serde_json::json;

fn schemata(sdl: &str) -> Schemata {
    Schemata::new(sdl).unwrap()
}

#[rstest]
#[case::objects("type Query { a: String } type A { x: Int }", "type B { y: Int } enum E { ONE }")]
#[case::everything(
    "type Query { a: U } union U = A | B type A { x: Int } type B { y: Int }",
    "input Filter { q: String } interface Node { id: ID } scalar Date directive @tag on OBJECT"
)]
fn disjoint_schemas_keep_every_type(#[case] left: &str, #[case] right: &str) {
    let (left, right) = (schemata(left), schemata(right));
    let merged = left
        .merge_sdl(&right, &ConflictResolvers::default())
        .unwrap()
        .document()
        .unwrap();
    for side in [&left, &right] {
        for definition in &side.document().unwrap().definitions {
            assert!(
                merged.definitions.contains(definition),
                "missing {definition:?}"
            );
        }
    }
}

#[test]
fn right_field_definition_wins_by_default() {
    let merged = schemata("type Query { a: String b: String }")
        .merge_sdl("type Query { a: Int! }", &ConflictResolvers::default())
        .unwrap();
    let schema = merged.type_schema().unwrap();
    assert_eq!(schema.type_field("Query", "a").unwrap().ty.to_string(), "Int!");
    assert_eq!(schema.type_field("Query", "b").unwrap().ty.to_string(), "String");
}

#[tokio::test]
async fn right_resolvers_win_and_left_ones_survive() {
    let left = schemata("type Query { a: String b: String }").with_resolvers(
        ResolverMap::new().with_type(
            "Query",
            [
                ("a", Resolver::constant(json!("left a"))),
                ("b", Resolver::constant(json!("left b"))),
            ],
        ),
    );
    let right = schemata("type Query { a: String }").with_resolvers(
        ResolverMap::new().with_type("Query", [("a", Resolver::constant(json!("right a")))]),
    );
    let schema = left
        .merge(&right, &MergeOptions::default())
        .unwrap()
        .schema()
        .unwrap();
    let a = schema.resolve("Query", "a", ResolverCall::default()).await;
    let b = schema.resolve("Query", "b", ResolverCall::default()).await;
    assert_eq!(a.unwrap(), json!("right a"));
    assert_eq!(b.unwrap(), json!("left b"));
}

fn schema_reader(shape: CallShape) -> Resolver {
    Resolver::from_fn(move |call| {
        let schema = match shape {
            CallShape::Info => call.info.schema(),
            CallShape::Context => call.context.schema(),
        };
        let schema = schema.ok_or("no schema installed")?;
        Ok(json!(schema.types.contains_key("Person")))
    })
    .with_shape(shape)
}

#[rstest]
#[case::info(CallShape::Info, true)]
#[case::context(CallShape::Context, true)]
#[case::not_injected(CallShape::Info, false)]
#[tokio::test]
async fn merged_resolvers_see_the_merged_schema(#[case] shape: CallShape, #[case] inject: bool) {
    let left = schemata("type Query { sees_person: Boolean }")
        .with_resolvers(ResolverMap::new().with("sees_person", schema_reader(shape)));
    let stale = Arc::new(left.type_schema().unwrap());
    let options = MergeOptions::from(MergeConfig {
        inject_merged_schema: inject,
        ..Default::default()
    });
    let merged = left
        .merge(&schemata("type Person { name: String }"), &options)
        .unwrap();

    let call = ResolverCall::default();
    call.info.set_schema(stale.clone());
    call.context.set_schema(stale);
    let sees_person = merged
        .schema()
        .unwrap()
        .resolve("Query", "sees_person", call)
        .await
        .unwrap();
    assert_eq!(sees_person, json!(inject));
}

#[test]
fn schema_injection_can_be_turned_off() {
    let peep = Resolver::constant(json!("peep"));
    let left = schemata("type Query { peep: String }")
        .with_resolvers(ResolverMap::new().with("peep", peep.clone()));
    let options = MergeOptions::from(MergeConfig::from_yaml("inject_merged_schema: false").unwrap());
    let merged = left
        .merge(&schemata("type Person { name: String }"), &options)
        .unwrap();
    let resolvers = merged.resolvers().unwrap();
    assert!(resolvers.get("peep").unwrap().as_resolver().unwrap().ptr_eq(&peep));
}

#[tokio::test]
async fn injectors_rewrite_every_call() {
    let echo = Resolver::from_fn(|call| Ok(Value::Object(call.args)));
    let left = schemata("type Query { echo: String }")
        .with_resolvers(ResolverMap::new().with_type("Query", [("echo", echo)]));
    let options = MergeOptions::default().with_injector(ResolverInjector::new(|mut call| {
        call.args.insert("injected".into(), json!(true));
        call
    }));
    let merged = left
        .merge(&schemata("type Person { name: String }"), &options)
        .unwrap();
    let echoed = merged
        .schema()
        .unwrap()
        .resolve("Query", "echo", ResolverCall::default())
        .await
        .unwrap();
    assert_eq!(echoed, json!({ "injected": true }));
}

#[tokio::test]
async fn missing_resolvers_default_to_the_parent_field() {
    let left = schemata("type Query { me: Person } type Person { name: String }").with_resolvers(
        ResolverMap::new().with("me", Resolver::constant(json!({ "name": "Sally", "age": 3 }))),
    );
    let options = MergeOptions {
        create_missing_resolvers: true,
        ..Default::default()
    };
    let merged = left
        .merge(&schemata("type Person { age: Int }"), &options)
        .unwrap();
    let resolvers = merged.resolvers().unwrap();
    let age = resolvers.resolver("Person", "age").unwrap();
    assert_eq!(age.base().label(), Some("defaultFieldResolver"));
    assert!(resolvers.resolver("Query", "me").is_none());

    let schema = merged.schema().unwrap();
    let me = schema
        .resolve("Query", "me", ResolverCall::default())
        .await
        .unwrap();
    let age = schema
        .resolve("Person", "age", ResolverCall::new("Person", "age").with_parent(me))
        .await
        .unwrap();
    assert_eq!(age, json!(3));
}

#[test]
fn scalar_configurations_are_carried_and_resolved() {
    let left_config = ScalarConfig::new().with_serialize(|_| Ok(json!("left")));
    let right_config = ScalarConfig::new().with_serialize(|_| Ok(json!("right")));
    let date = apollo_compiler::name!("Date");
    let time = apollo_compiler::name!("Time");
    let left = schemata("scalar Date scalar Time type Query { d: Date t: Time }")
        .with_scalar(date.clone(), left_config.clone())
        .with_scalar(time, left_config);
    let right = schemata("scalar Date").with_scalar(date, right_config);

    let merged = left.merge(&right, &MergeOptions::default()).unwrap();
    let schema = merged.schema().unwrap();
    let serialize = |name: &str| schema.scalar(name).unwrap().serialize(&Value::Null).unwrap();
    assert_eq!(serialize("Date"), json!("right"));
    assert_eq!(serialize("Time"), json!("left"));

    let keep_left = MergeOptions::default()
        .with_conflict_resolvers(ConflictResolvers::default().with_scalar(|_, left, right| left.or(right).cloned()));
    let merged = left.merge(&right, &keep_left).unwrap();
    let schema = merged.schema().unwrap();
    assert_eq!(schema.scalar("Date").unwrap().serialize(&Value::Null).unwrap(), json!("left"));
}
