use std::collections::HashMap;

pub fn builtin_encounters() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("street_ambush", include_str!("../content/encounters/street_ambush.json")),
        ("arcology_raid", include_str!("../content/encounters/arcology_raid.json")),
    ])
}
