//! An example of using the [`CriteriaBuilder`] fluent API to construct
//! criteria in code rather than parsing them from JSON.
use mongrep::{Criteria, CriteriaBuilder, Matcher};
use serde_json::json;

fn main() {
    // Construct the criteria {"age": {"$gte": 18}, "status": "active"}
    let criteria: Criteria = CriteriaBuilder::new().gte("age", 18).eq("status", "active").build();

    // Built criteria are equal to the same criteria parsed from JSON
    let parsed: Criteria = r#"{"age": {"$gte": 18}, "status": "active"}"#.parse().unwrap();
    assert_eq!(criteria, parsed);

    // Another, more complex example:
    // {"$or": [{"address.city": {"$in": ["Paris", "Lyon"]}},
    //          {"$where": "score * 2 > 150"}],
    //  "banned": {"$exists": false}}
    let local = CriteriaBuilder::new()
        .in_values("address.city", vec![json!("Paris"), json!("Lyon")])
        .build();
    let high_scorer = CriteriaBuilder::new().where_expr("score * 2 > 150").build();
    let criteria = CriteriaBuilder::new()
        .or(vec![local, high_scorer])
        .exists("banned", false)
        .build();

    let users = vec![
        json!({"name": "Camille", "address": {"city": "Lyon"}, "score": 10}),
        json!({"name": "Sam", "address": {"city": "Leeds"}, "score": 90}),
        json!({"name": "Ira", "address": {"city": "Paris"}, "banned": true}),
        json!({"name": "Noor", "address": {"city": "Oslo"}, "score": 70}),
    ];

    let matcher = Matcher::from(criteria);
    let names: Vec<_> = matcher.find(&users).into_iter().map(|u| &u["name"]).collect();
    assert_eq!(names, vec!["Camille", "Sam"]);
    println!("{}", serde_json::to_string_pretty(&names).unwrap());
}
