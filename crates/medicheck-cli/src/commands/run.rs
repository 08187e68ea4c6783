//! Scripted end-to-end session.

use anyhow::{Context, Result};
use medicheck_application::{OrchestratorSettings, SessionOrchestrator};
use medicheck_core::config::MedicheckConfig;
use medicheck_core::consultation::NavigationSink;
use medicheck_core::decision_graph::Step;
use medicheck_core::diagnosis::{DiseaseMatch, overall_urgency};
use medicheck_core::ontology::OntologyClient;
use medicheck_core::phenotype::{OntologyTerm, PhenotypeSource};
use medicheck_infrastructure::TomlConsultationRepository;
use std::sync::Arc;

pub struct RunOptions {
    pub answer_all: bool,
    pub save: bool,
}

/// Prints a one-line summary when the session completes.
struct StderrNavigation;

impl NavigationSink for StderrNavigation {
    fn on_complete(&self, session_id: &str, results: &[DiseaseMatch]) {
        eprintln!(
            "Consultation {} complete: {} candidate(s), urgency {}",
            session_id,
            results.len(),
            overall_urgency(results)
        );
    }
}

pub async fn run<C>(
    client: Arc<C>,
    config: &MedicheckConfig,
    term_ids: &[String],
    options: RunOptions,
) -> Result<()>
where
    C: OntologyClient + 'static,
{
    let mut orchestrator = SessionOrchestrator::new(client.clone())
        .with_settings(OrchestratorSettings::from_config(&config.ontology))
        .with_navigation_sink(Arc::new(StderrNavigation));
    if options.save {
        let repository = match &config.storage.consultations_dir {
            Some(dir) => TomlConsultationRepository::new(dir)?,
            None => TomlConsultationRepository::default_location()?,
        };
        orchestrator = orchestrator.with_consultation_sink(Arc::new(repository));
    }

    for id in term_ids {
        let term = resolve_term(client.as_ref(), id).await;
        eprintln!("Selected {} ({})", term.name, term.id);
        orchestrator
            .add_phenotype(&term, PhenotypeSource::Search)
            .await?;
    }

    orchestrator.proceed().await?;
    loop {
        let session = orchestrator
            .refinement()
            .await
            .context("Refinement session missing")?;
        let item = session
            .current_item()
            .await
            .context("No refinement question to answer")?;

        let step = match (item.error(), item.children().first()) {
            (Some(reason), _) => {
                eprintln!("{}: {}", item.phenotype_name, reason);
                orchestrator.skip().await?
            }
            (None, Some(child)) if options.answer_all => {
                eprintln!("{} -> {}", item.phenotype_name, child.name);
                orchestrator.answer(vec![child.id.clone()]).await?
            }
            (None, None) => {
                eprintln!("{}: no more specific options", item.phenotype_name);
                orchestrator.skip().await?
            }
            (None, Some(_)) => {
                eprintln!(
                    "{}: skipped {} option(s)",
                    item.phenotype_name,
                    item.children().len()
                );
                orchestrator.skip().await?
            }
        };
        if step == Step::Results {
            break;
        }
    }

    let state = orchestrator.state().await;
    if let Some(error) = &state.error {
        eprintln!("Warning: {}", error);
    }
    println!("{}", serde_json::to_string_pretty(&state.diagnosis_results)?);
    Ok(())
}

/// Looks up the display name of `id`, falling back to the id itself.
async fn resolve_term(client: &dyn OntologyClient, id: &str) -> OntologyTerm {
    match client.search_terms(id, None, 5).await {
        Ok(terms) => terms
            .into_iter()
            .find(|t| t.id == id)
            .unwrap_or_else(|| OntologyTerm::new(id, id)),
        Err(e) => {
            tracing::debug!("[CLI] Name lookup for {} failed: {}", id, e);
            OntologyTerm::new(id, id)
        }
    }
}
