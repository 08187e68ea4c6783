//! One-shot ontology queries.

use anyhow::Result;
use medicheck_core::ontology::{ChildAssociation, OntologyClient};

pub async fn search(
    client: &dyn OntologyClient,
    query: &str,
    category: Option<&str>,
    limit: usize,
) -> Result<()> {
    let terms = client.search_terms(query, category, limit).await?;
    println!("{}", serde_json::to_string_pretty(&terms)?);
    Ok(())
}

pub async fn children(client: &dyn OntologyClient, term_id: &str, limit: usize) -> Result<()> {
    let children: Vec<_> = client
        .get_children(term_id, limit)
        .await?
        .into_iter()
        .map(ChildAssociation::into_term)
        .collect();
    if children.is_empty() {
        eprintln!("{} has no more specific terms", term_id);
    }
    println!("{}", serde_json::to_string_pretty(&children)?);
    Ok(())
}

pub async fn match_diseases(client: &dyn OntologyClient, term_ids: &[String]) -> Result<()> {
    let matches = client.match_diseases(term_ids).await?;
    println!("{}", serde_json::to_string_pretty(&matches)?);
    Ok(())
}
