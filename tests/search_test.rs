use std::sync::Arc;

use chrysalis::document::Document;
use chrysalis::error::ChrysalisError;
use chrysalis::index::Index;
use chrysalis::query::searcher::{SearcherConfig, WildcardScorePolicy};
use chrysalis::query::{
    BooleanQuery, FieldFilterQuery, PhraseQuery, TermQuery, WildcardQuery,
};
use chrysalis::schema::{FieldSpec, FieldValue, Schema};
use chrysalis::storage::memory::MemoryStorage;

fn animal_index() -> chrysalis::Result<Index> {
    let schema = Schema::builder()
        .add_field("body", FieldSpec::text())
        .add_field("category", FieldSpec::categorical())
        .add_field("year", FieldSpec::numeric())
        .build()?;
    let index = Index::new(Arc::new(MemoryStorage::new()), schema);

    // doc 0: two mentions of "cat"
    index.add_document(
        Document::new()
            .add_text("body", "The cat sat on the mat. The cat purred softly.")
            .add_categorical("category", "pets")
            .add_numeric("year", 2019.0),
    )?;
    // doc 1: one mention of "cat"
    index.add_document(
        Document::new()
            .add_text("body", "A cat slept near the fire.")
            .add_categorical("category", "pets")
            .add_numeric("year", 2021.0),
    )?;
    // doc 2: no "cat"
    index.add_document(
        Document::new()
            .add_text("body", "Dogs barked all night long.")
            .add_categorical("category", "pets")
            .add_numeric("year", 2023.0),
    )?;
    index.commit()?;
    Ok(index)
}

#[test]
fn test_tfidf_ranks_higher_frequency_first() -> chrysalis::Result<()> {
    let index = animal_index()?;
    let results = index.search(&TermQuery::new("body", "cat"), 0, 10)?;

    assert_eq!(results.total_hits, 2);
    assert_eq!(results.hits[0].doc_id, 0);
    assert_eq!(results.hits[1].doc_id, 1);
    assert!(results.hits[0].score > results.hits[1].score);
    assert!(results.hits[1].score > 0.0);
    Ok(())
}

#[test]
fn test_absent_term_matches_nothing() -> chrysalis::Result<()> {
    let index = animal_index()?;
    let results = index.search(&TermQuery::new("body", "zebra"), 0, 10)?;
    assert_eq!(results.total_hits, 0);
    assert!(results.hits.is_empty());
    Ok(())
}

#[test]
fn test_hits_carry_stored_fields() -> chrysalis::Result<()> {
    let index = animal_index()?;
    let results = index.search(&TermQuery::new("body", "dogs"), 0, 10)?;

    let doc = results.hits[0].document.as_ref().unwrap();
    assert_eq!(
        doc.get_field("category"),
        Some(&FieldValue::Categorical("pets".into()))
    );
    Ok(())
}

#[test]
fn test_wildcard_single_char() -> chrysalis::Result<()> {
    let schema = Schema::builder()
        .add_field("body", FieldSpec::text())
        .build()?;
    let index = Index::new(Arc::new(MemoryStorage::new()), schema);
    index.add_document(Document::new().add_text("body", "One cat appeared."))?;
    index.add_document(Document::new().add_text("body", "One cot collapsed."))?;
    index.add_document(Document::new().add_text("body", "One cart rolled."))?;
    index.commit()?;

    let query = WildcardQuery::new("body", "c?t")?;
    let searcher = index.searcher()?;
    let ids = searcher.filter(&query)?;
    // "cat" and "cot" match, "cart" does not.
    assert_eq!(ids, vec![0, 1]);
    Ok(())
}

#[test]
fn test_wildcard_score_policies() -> chrysalis::Result<()> {
    let schema = Schema::builder()
        .add_field("body", FieldSpec::text())
        .build()?;
    let index = Index::new(Arc::new(MemoryStorage::new()), schema);
    // doc 0 matches two expansions, doc 1 matches one.
    index.add_document(Document::new().add_text("body", "Carts and cards everywhere."))?;
    index.add_document(Document::new().add_text("body", "Carts only here."))?;
    index.add_document(Document::new().add_text("body", "Nothing relevant here."))?;
    index.commit()?;

    let query = WildcardQuery::new("body", "car*")?;

    let max = index
        .searcher_with_config(
            SearcherConfig::new().with_wildcard_policy(WildcardScorePolicy::Max),
        )?
        .search(&query, 0, 10)?;
    let sum = index
        .searcher_with_config(
            SearcherConfig::new().with_wildcard_policy(WildcardScorePolicy::Sum),
        )?
        .search(&query, 0, 10)?;

    assert_eq!(max.total_hits, 2);
    assert_eq!(sum.total_hits, 2);
    // Under Sum the two-variant document accumulates both terms; under Max
    // it is credited only the best one.
    let max_doc0 = max.hits.iter().find(|h| h.doc_id == 0).unwrap().score;
    let sum_doc0 = sum.hits.iter().find(|h| h.doc_id == 0).unwrap().score;
    assert!(sum_doc0 > max_doc0);
    Ok(())
}

#[test]
fn test_boolean_set_semantics() -> chrysalis::Result<()> {
    let schema = Schema::builder()
        .add_field("body", FieldSpec::text())
        .build()?;
    let index = Index::new(Arc::new(MemoryStorage::new()), schema);
    index.add_document(Document::new().add_text("body", "Red apples taste sweet."))?; // 0
    index.add_document(Document::new().add_text("body", "Red grapes taste sour."))?; // 1
    index.add_document(Document::new().add_text("body", "Green apples taste sour."))?; // 2
    index.commit()?;
    let searcher = index.searcher()?;

    // red AND taste -> 0, 1
    let and = BooleanQuery::builder()
        .must(Box::new(TermQuery::new("body", "red")))
        .must(Box::new(TermQuery::new("body", "taste")))
        .build();
    assert_eq!(searcher.filter(&and)?, vec![0, 1]);

    // red OR green -> all
    let or = BooleanQuery::builder()
        .should(Box::new(TermQuery::new("body", "red")))
        .should(Box::new(TermQuery::new("body", "green")))
        .build();
    assert_eq!(searcher.filter(&or)?, vec![0, 1, 2]);

    // apples NOT sour -> 0
    let not = BooleanQuery::builder()
        .must(Box::new(TermQuery::new("body", "apples")))
        .must_not(Box::new(TermQuery::new("body", "sour")))
        .build();
    assert_eq!(searcher.filter(&not)?, vec![0]);
    Ok(())
}

#[test]
fn test_should_clause_raises_score_without_filtering() -> chrysalis::Result<()> {
    let schema = Schema::builder()
        .add_field("body", FieldSpec::text())
        .build()?;
    let index = Index::new(Arc::new(MemoryStorage::new()), schema);
    index.add_document(Document::new().add_text("body", "Fresh apples daily."))?; // 0
    index.add_document(Document::new().add_text("body", "Fresh apples and ripe pears."))?; // 1
    index.add_document(Document::new().add_text("body", "Stale bread only."))?; // 2
    index.commit()?;

    let query = BooleanQuery::builder()
        .must(Box::new(TermQuery::new("body", "apples")))
        .should(Box::new(TermQuery::new("body", "pears")))
        .build();
    let results = index.search(&query, 0, 10)?;

    assert_eq!(results.total_hits, 2);
    // The document also matching the optional clause ranks first.
    assert_eq!(results.hits[0].doc_id, 1);
    Ok(())
}

#[test]
fn test_phrase_requires_adjacency() -> chrysalis::Result<()> {
    let schema = Schema::builder()
        .add_field("body", FieldSpec::text())
        .build()?;
    let index = Index::new(Arc::new(MemoryStorage::new()), schema);
    index.add_document(Document::new().add_text("body", "The quick brown fox jumped."))?;
    index.add_document(Document::new().add_text("body", "The brown quick fox jumped."))?;
    index.commit()?;

    let phrase = PhraseQuery::new("body", ["quick", "brown"]);
    let ids = index.searcher()?.filter(&phrase)?;
    assert_eq!(ids, vec![0]);
    Ok(())
}

#[test]
fn test_field_filters() -> chrysalis::Result<()> {
    let index = animal_index()?;
    let searcher = index.searcher()?;

    let equals = FieldFilterQuery::equals("category", FieldValue::Categorical("pets".into()))?;
    assert_eq!(searcher.count(&equals)?, 3);

    let range = FieldFilterQuery::numeric_range("year", Some(2020.0), Some(2022.0))?;
    assert_eq!(searcher.filter(&range)?, vec![1]);
    Ok(())
}

#[test]
fn test_filter_constrains_without_changing_ranking() -> chrysalis::Result<()> {
    let index = animal_index()?;
    let query = BooleanQuery::builder()
        .must(Box::new(TermQuery::new("body", "cat")))
        .must(Box::new(FieldFilterQuery::numeric_range(
            "year",
            Some(2015.0),
            Some(2020.0),
        )?))
        .build();
    let results = index.search(&query, 0, 10)?;

    assert_eq!(results.total_hits, 1);
    assert_eq!(results.hits[0].doc_id, 0);
    // The filter clause contributes no score of its own.
    assert!(results.hits[0].score > 0.0);
    Ok(())
}

#[test]
fn test_paging_keeps_total_hits() -> chrysalis::Result<()> {
    let schema = Schema::builder()
        .add_field("body", FieldSpec::text())
        .build()?;
    let index = Index::new(Arc::new(MemoryStorage::new()), schema);
    for i in 0..5 {
        index.add_document(
            Document::new().add_text("body", format!("Common word number {i}.").as_str()),
        )?;
    }
    index.commit()?;

    let page = index.search(&TermQuery::new("body", "common"), 2, 2)?;
    assert_eq!(page.total_hits, 5);
    assert_eq!(page.hits.len(), 2);
    Ok(())
}

#[test]
fn test_cancelled_single_term_search_stops() -> chrysalis::Result<()> {
    let index = animal_index()?;
    let searcher = index.searcher()?;
    searcher.cancel_token().cancel();

    let err = searcher
        .search(&TermQuery::new("body", "cat"), 0, 10)
        .unwrap_err();
    assert!(matches!(err, ChrysalisError::Cancelled));
    let err = searcher.count(&TermQuery::new("body", "cat")).unwrap_err();
    assert!(matches!(err, ChrysalisError::Cancelled));
    Ok(())
}

#[test]
fn test_frames_returned_for_hits() -> chrysalis::Result<()> {
    let schema = Schema::builder()
        .add_field("body", FieldSpec::text())
        .build()?;
    let index = Index::new(Arc::new(MemoryStorage::new()), schema);
    index.add_document(Document::new().add_text(
        "body",
        "The cat sat. The dog ran. Birds fly high in the sky.",
    ))?;
    index.commit()?;

    let reader = index.reader()?;
    let frames = reader.frames(0)?;
    assert_eq!(
        frames,
        vec![
            "The cat sat. The dog ran.".to_string(),
            "Birds fly high in the sky.".to_string()
        ]
    );

    // The postings carry the frame each occurrence landed in.
    let posting = reader.postings("body:birds")?.next().unwrap();
    assert_eq!(posting.positions[0].frame, 1);
    Ok(())
}
