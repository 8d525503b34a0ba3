use searchcore::tokenizer::tokenize;
use searchcore::{parse_document, Document, Engine, EngineConfig, SearchError};
use serde_json::{json, Value};
use std::collections::BTreeMap;

fn doc(value: Value) -> Document {
    parse_document(value).unwrap()
}

fn term(word: &str) -> String {
    tokenize(word).remove(0)
}

fn engine() -> Engine {
    Engine::open(EngineConfig::temporary()).unwrap()
}

#[test]
fn identical_content_is_stored_once() {
    let engine = engine();
    let a = engine.add(doc(json!({"title": "lantern", "n": 1}))).unwrap();
    let b = engine.add(doc(json!({"n": 1, "title": "lantern"}))).unwrap();
    let c = engine.add(doc(json!({"title": "candle", "n": 1}))).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(engine.count().unwrap(), 2);
    assert_eq!(engine.index().document_frequency("lantern").unwrap(), 1);
    assert_eq!(engine.search("lantern").unwrap().len(), 1);
}

#[test]
fn field_ids_follow_first_use() {
    let engine = engine();
    for value in [
        json!({"title": "one"}),
        json!({"body": "two"}),
        json!({"title": "three"}),
        json!({"tags": "four"}),
    ] {
        engine.add(doc(value)).unwrap();
    }
    let ids: Vec<_> = engine
        .field_boosts()
        .unwrap()
        .into_iter()
        .map(|f| (f.name, f.id))
        .collect();
    assert_eq!(
        ids,
        vec![("title".to_string(), 0), ("body".to_string(), 1), ("tags".to_string(), 2)]
    );
}

#[test]
fn vacation_cooking_scenario() {
    let engine = engine();
    let one = engine.add(doc(json!({"id": 1, "title": "Great cooking ideas"}))).unwrap();
    let two = engine.add(doc(json!({"id": 2, "title": "Interesting vacation destinations"}))).unwrap();
    let three = engine.add(doc(json!({"id": 3, "title": "Sample document"}))).unwrap();

    let hits = engine.search("vacation cooking").unwrap();
    let ids: Vec<_> = hits.iter().map(|h| h.id.clone()).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&one));
    assert!(ids.contains(&two));
    assert!(!ids.contains(&three));
}

#[test]
fn body_boost_outranks_title() {
    let engine = engine();
    let in_title = engine.add(doc(json!({"title": "lighthouse"}))).unwrap();
    let in_body = engine.add(doc(json!({"body": "lighthouse"}))).unwrap();
    engine
        .set_field_boosts(&BTreeMap::from([("title".to_string(), 1.0), ("body".to_string(), 3.0)]))
        .unwrap();
    let hits = engine.search("lighthouse").unwrap();
    assert_eq!(hits[0].id, in_body);
    assert_eq!(hits[1].id, in_title);
    assert!(hits[0].score > hits[1].score);
}

#[test]
fn deleted_documents_never_surface() {
    let engine = engine();
    let gone = engine.add(doc(json!({"title": "ephemeral note"}))).unwrap();
    let kept = engine.add(doc(json!({"title": "durable note"}))).unwrap();
    assert!(engine.delete(&gone).unwrap());
    assert!(!engine.delete(&gone).unwrap());
    assert_eq!(engine.get(&gone).unwrap(), None);

    // postings remain, the document does not
    assert_eq!(engine.index().document_frequency(&term("ephemeral")).unwrap(), 1);
    assert!(engine.search("ephemeral").unwrap().is_empty());
    let hits = engine.search("note").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, kept);
    assert_eq!(engine.count().unwrap(), 2);
}

#[test]
fn delete_then_readd_indexes_once() {
    let engine = engine();
    let original = doc(json!({"title": "harbor lights"}));
    let readded = engine.add(original.clone()).unwrap();
    let twin = engine.add(doc(json!({"title": "harbor lights", "pier": 9}))).unwrap();

    assert!(engine.delete(&readded).unwrap());
    assert_eq!(engine.add(original).unwrap(), readded);
    assert_eq!(engine.count().unwrap(), 3);

    let harbor = engine.index().postings_for(&term("harbor")).unwrap();
    assert_eq!(harbor.len(), 2);
    for (id, postings) in &harbor {
        assert_eq!(postings.len(), 1, "postings for {id}");
    }
    let hits = engine.search("harbor lights").unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits[0].score < 2.0 * hits[1].score);
    assert!(hits.iter().any(|h| h.id == twin));
}

#[test]
fn purge_on_delete_drops_postings() {
    let engine = Engine::open(EngineConfig::temporary().purge_on_delete(true)).unwrap();
    let id = engine.add(doc(json!({"title": "ephemeral"}))).unwrap();
    engine.delete(&id).unwrap();
    assert_eq!(engine.index().document_frequency(&term("ephemeral")).unwrap(), 0);
    assert_eq!(engine.count().unwrap(), 1);
}

#[test]
fn update_keeps_id_and_stale_index() {
    let engine = engine();
    let id = engine.add(doc(json!({"title": "original heading", "year": 2001}))).unwrap();
    engine.update(&id, doc(json!({"title": "revised heading"}))).unwrap();

    let stored = engine.get(&id).unwrap().unwrap();
    assert_eq!(stored.id, id);
    assert_eq!(stored.fields["title"], "revised heading");
    assert_eq!(stored.fields["year"], 2001);

    assert_eq!(engine.search("original").unwrap()[0].id, id);
    assert!(engine.search("revised").unwrap().is_empty());
}

#[test]
fn reindex_on_update_tracks_new_content() {
    let engine = Engine::open(EngineConfig::temporary().reindex_on_update(true)).unwrap();
    let id = engine.add(doc(json!({"title": "original heading"}))).unwrap();
    engine.update(&id, doc(json!({"title": "revised heading"}))).unwrap();
    assert_eq!(engine.search("revised").unwrap()[0].id, id);
    assert!(engine.search("original").unwrap().is_empty());
    assert_eq!(engine.count().unwrap(), 1);
}

#[test]
fn update_missing_is_not_found() {
    let engine = engine();
    let id = engine.add(doc(json!({"title": "x"}))).unwrap();
    engine.delete(&id).unwrap();
    let err = engine.update(&id, doc(json!({"title": "y"}))).unwrap_err();
    assert!(matches!(err, SearchError::NotFound(_)));
}

#[test]
fn empty_query_is_empty_not_error() {
    let engine = engine();
    engine.add(doc(json!({"title": "anything"}))).unwrap();
    assert!(engine.search("").unwrap().is_empty());
    assert!(engine.search("   ").unwrap().is_empty());
    assert!(engine.search("nothing matches").unwrap().is_empty());
}

#[test]
fn non_text_fields_are_stored_not_indexed() {
    let engine = engine();
    let id = engine.add(doc(json!({"count": 42, "tags": ["rust"], "title": "kept"}))).unwrap();
    assert!(engine.search("rust").unwrap().is_empty());
    assert_eq!(engine.get(&id).unwrap().unwrap().fields["tags"], json!(["rust"]));
}

#[test]
fn concurrent_adds_keep_count_and_field_ids() {
    let engine = engine();
    std::thread::scope(|s| {
        for worker in 0..8 {
            let engine = engine.clone();
            s.spawn(move || {
                for n in 0..10 {
                    let value = json!({
                        "title": format!("worker {worker} item {n}"),
                        "body": "shared body text",
                        format!("extra{}", n % 3): "misc",
                    });
                    engine.add(doc(value)).unwrap();
                }
            });
        }
    });
    assert_eq!(engine.count().unwrap(), 80);
    assert_eq!(engine.index().document_frequency(&term("shared")).unwrap(), 80);

    let mut ids: Vec<u32> = engine.field_boosts().unwrap().into_iter().map(|f| f.id).collect();
    ids.sort();
    assert_eq!(ids, (0..5).collect::<Vec<_>>());
}

#[test]
fn state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let id = {
        let engine = Engine::open(EngineConfig::persistent(dir.path())).unwrap();
        let id = engine.add(doc(json!({"title": "persistent index"}))).unwrap();
        engine
            .set_field_boosts(&BTreeMap::from([("title".to_string(), 2.5)]))
            .unwrap();
        engine.flush().unwrap();
        id
    };
    let engine = Engine::open(EngineConfig::persistent(dir.path())).unwrap();
    assert_eq!(engine.count().unwrap(), 1);
    assert_eq!(engine.search("persistent").unwrap()[0].id, id);
    assert_eq!(engine.field_boosts().unwrap()[0].boost, 2.5);
}
