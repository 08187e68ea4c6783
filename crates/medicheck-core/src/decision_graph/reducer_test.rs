#[cfg(test)]
mod tests {
    use crate::chat::ChatMessage;
    use crate::decision_graph::{
        DecisionGraphAction, DecisionGraphState, PatientInfo, RefinementQuestion, Step, reduce,
        replay,
    };
    use crate::diagnosis::{DiseaseMatch, UrgencyPolicy};
    use crate::phenotype::{OntologyTerm, PhenotypeSource, SelectedPhenotype};
    use chrono::Utc;
    use proptest::prelude::*;

    fn phenotype(id: &str, name: &str) -> SelectedPhenotype {
        SelectedPhenotype::from_term(&OntologyTerm::new(id, name), PhenotypeSource::Search, Utc::now())
    }

    fn add(state: &DecisionGraphState, id: &str, name: &str) -> DecisionGraphState {
        reduce(
            state,
            &DecisionGraphAction::AddPhenotype {
                phenotype: phenotype(id, name),
            },
        )
    }

    /// Headache and fever selected, refinement entered, headache's children loaded.
    fn refining_state() -> DecisionGraphState {
        let state = add(&DecisionGraphState::default(), "HP:0002315", "Headache");
        let state = add(&state, "HP:0001945", "Fever");
        let questions = state
            .primary_phenotypes()
            .map(RefinementQuestion::pending)
            .collect();
        let state = reduce(&state, &DecisionGraphAction::SetRefinementQuestions { questions });
        reduce(
            &state,
            &DecisionGraphAction::SetRefinementChildren {
                phenotype_id: "HP:0002315".into(),
                children: vec![
                    OntologyTerm::new("HP:0002325", "Sudden headache"),
                    OntologyTerm::new("HP:0002076", "Migraine"),
                ],
            },
        )
    }

    fn assert_consistent(state: &DecisionGraphState) {
        for q in &state.refinement_questions {
            for child_id in &q.selected_child_ids {
                let p = state
                    .selected_phenotypes
                    .iter()
                    .find(|p| &p.id == child_id)
                    .expect("selected child must be a selected phenotype");
                assert_eq!(p.source, PhenotypeSource::Refinement);
                assert_eq!(p.parent_id.as_deref(), Some(q.phenotype_id.as_str()));
            }
        }
        for p in state.refined_phenotypes() {
            let parent = p.parent_id.as_deref().unwrap();
            if let Some(q) = state.question_for(parent) {
                assert!(q.selected_child_ids.contains(&p.id));
            }
        }
    }

    #[test]
    fn test_initial_state() {
        let state = DecisionGraphState::default();
        assert_eq!(state.current_step, Step::Search);
        assert!(state.selected_phenotypes.is_empty());
        assert_eq!(state.current_refinement_index, 0);
        assert!(state.diagnosis_timestamp.is_none());
        assert!(!state.is_loading);
    }

    #[test]
    fn test_add_phenotype_ignores_duplicates() {
        let state = add(&DecisionGraphState::default(), "HP:0002315", "Headache");
        let again = add(&state, "HP:0002315", "Headache (again)");
        assert_eq!(again, state);
        assert_eq!(again.selected_phenotypes.len(), 1);
        assert_eq!(again.selected_phenotypes[0].name, "Headache");
    }

    #[test]
    fn test_reduce_does_not_touch_input() {
        let state = add(&DecisionGraphState::default(), "HP:0002315", "Headache");
        let before = state.clone();
        let _ = reduce(&state, &DecisionGraphAction::Reset);
        assert_eq!(state, before);
    }

    #[test]
    fn test_remove_phenotype_prunes_its_question_only() {
        let state = refining_state();
        let state = reduce(
            &state,
            &DecisionGraphAction::RemovePhenotype {
                id: "HP:0002315".into(),
            },
        );
        assert_eq!(state.refinement_questions.len(), 1);
        assert_eq!(state.refinement_questions[0].phenotype_id, "HP:0001945");
        assert!(!state.has_phenotype("HP:0002315"));
    }

    #[test]
    fn test_remove_primary_cascades_to_refinements() {
        let state = reduce(&refining_state(), &DecisionGraphAction::toggle_child(0, "HP:0002325"));
        assert!(state.has_phenotype("HP:0002325"));

        let state = reduce(
            &state,
            &DecisionGraphAction::RemovePhenotype {
                id: "HP:0002315".into(),
            },
        );
        assert!(!state.has_phenotype("HP:0002325"));
        assert_consistent(&state);
    }

    #[test]
    fn test_remove_refinement_clears_question_selection() {
        let state = reduce(&refining_state(), &DecisionGraphAction::toggle_child(0, "HP:0002325"));
        let state = reduce(
            &state,
            &DecisionGraphAction::RemovePhenotype {
                id: "HP:0002325".into(),
            },
        );
        assert!(state.refinement_questions[0].selected_child_ids.is_empty());
        assert_eq!(state.refinement_questions.len(), 2);
    }

    #[test]
    fn test_remove_clamps_refinement_index() {
        let state = reduce(&refining_state(), &DecisionGraphAction::SkipRefinement { index: 0 });
        let state = reduce(&state, &DecisionGraphAction::SkipRefinement { index: 1 });
        assert_eq!(state.current_refinement_index, 2);

        let state = reduce(
            &state,
            &DecisionGraphAction::RemovePhenotype {
                id: "HP:0001945".into(),
            },
        );
        assert_eq!(state.current_refinement_index, 1);
        assert!(state.is_refinement_complete());
    }

    /// Headache, fever and seizure selected with one question each.
    fn three_questions() -> DecisionGraphState {
        let state = add(&DecisionGraphState::default(), "HP:0002315", "Headache");
        let state = add(&state, "HP:0001945", "Fever");
        let state = add(&state, "HP:0001250", "Seizure");
        let questions = state
            .primary_phenotypes()
            .map(RefinementQuestion::pending)
            .collect();
        reduce(&state, &DecisionGraphAction::SetRefinementQuestions { questions })
    }

    #[test]
    fn test_removing_earlier_question_keeps_pointer_on_same_question() {
        let state = reduce(&three_questions(), &DecisionGraphAction::SkipRefinement { index: 0 });
        assert_eq!(state.current_refinement_index, 1);

        let state = reduce(
            &state,
            &DecisionGraphAction::RemovePhenotype {
                id: "HP:0002315".into(),
            },
        );
        assert_eq!(state.current_refinement_index, 0);
        assert_eq!(
            state.refinement_questions[state.current_refinement_index].phenotype_id,
            "HP:0001945"
        );
    }

    #[test]
    fn test_removing_current_or_later_question_keeps_index() {
        let state = reduce(&three_questions(), &DecisionGraphAction::SkipRefinement { index: 0 });

        let later = reduce(
            &state,
            &DecisionGraphAction::RemovePhenotype {
                id: "HP:0001250".into(),
            },
        );
        assert_eq!(later.current_refinement_index, 1);
        assert_eq!(later.refinement_questions[1].phenotype_id, "HP:0001945");

        // The current question goes; the pointer lands on the one after it.
        let current = reduce(
            &state,
            &DecisionGraphAction::RemovePhenotype {
                id: "HP:0001945".into(),
            },
        );
        assert_eq!(current.current_refinement_index, 1);
        assert_eq!(current.refinement_questions[1].phenotype_id, "HP:0001250");
    }

    #[test]
    fn test_set_refinement_questions_drops_orphans_and_resets_index() {
        let state = reduce(&refining_state(), &DecisionGraphAction::SkipRefinement { index: 0 });
        let orphan = RefinementQuestion::pending(&phenotype("HP:9999999", "Unselected"));
        let headache = state.refinement_questions[0].clone();
        let state = reduce(
            &state,
            &DecisionGraphAction::SetRefinementQuestions {
                questions: vec![headache, orphan],
            },
        );
        assert_eq!(state.refinement_questions.len(), 1);
        assert_eq!(state.current_refinement_index, 0);
    }

    #[test]
    fn test_set_children_for_unknown_question_is_noop() {
        let state = refining_state();
        let next = reduce(
            &state,
            &DecisionGraphAction::SetRefinementChildren {
                phenotype_id: "HP:0000000".into(),
                children: vec![OntologyTerm::new("HP:1", "x")],
            },
        );
        assert_eq!(next, state);
    }

    #[test]
    fn test_toggle_on_then_off_restores_selection() {
        let state = refining_state();
        let on = reduce(&state, &DecisionGraphAction::toggle_child(0, "HP:0002325"));
        assert!(on.refinement_questions[0].selected_child_ids.contains("HP:0002325"));
        let refined = on.refined_phenotypes();
        assert_eq!(refined.len(), 1);
        assert_eq!(refined[0].parent_id.as_deref(), Some("HP:0002315"));
        assert_eq!(refined[0].name, "Sudden headache");

        let off = reduce(&on, &DecisionGraphAction::toggle_child(0, "HP:0002325"));
        assert_eq!(off.selected_phenotypes, state.selected_phenotypes);
        assert!(off.refinement_questions[0].selected_child_ids.is_empty());
    }

    #[test]
    fn test_toggle_rejects_unknown_child_and_index() {
        let state = refining_state();
        assert_eq!(reduce(&state, &DecisionGraphAction::toggle_child(0, "HP:1234567")), state);
        assert_eq!(reduce(&state, &DecisionGraphAction::toggle_child(7, "HP:0002325")), state);
    }

    #[test]
    fn test_toggle_child_already_selected_directly_is_noop() {
        let state = add(&refining_state(), "HP:0002076", "Migraine");
        let next = reduce(&state, &DecisionGraphAction::toggle_child(0, "HP:0002076"));
        assert_eq!(next, state);
        assert!(next.refinement_questions[0].selected_child_ids.is_empty());
    }

    #[test]
    fn test_answer_reconciles_selection() {
        let state = reduce(&refining_state(), &DecisionGraphAction::toggle_child(0, "HP:0002325"));
        let state = reduce(
            &state,
            &DecisionGraphAction::answer(0, vec!["HP:0002076".into(), "HP:0000000".into()]),
        );
        let q = &state.refinement_questions[0];
        assert!(q.answered);
        assert_eq!(q.selected_child_ids.len(), 1);
        assert!(q.selected_child_ids.contains("HP:0002076"));
        assert!(!state.has_phenotype("HP:0002325"));
        assert!(!state.has_phenotype("HP:0000000"));
        assert_eq!(state.current_refinement_index, 1);
        assert_consistent(&state);
    }

    #[test]
    fn test_answer_and_skip_out_of_range_are_noops() {
        let state = refining_state();
        assert_eq!(reduce(&state, &DecisionGraphAction::answer(2, vec![])), state);
        assert_eq!(
            reduce(&state, &DecisionGraphAction::SkipRefinement { index: 2 }),
            state
        );
    }

    #[test]
    fn test_skip_keeps_selected_children() {
        let state = reduce(&refining_state(), &DecisionGraphAction::toggle_child(0, "HP:0002325"));
        let state = reduce(&state, &DecisionGraphAction::SkipRefinement { index: 0 });
        assert!(state.refinement_questions[0].answered);
        assert!(state.refinement_questions[0].selected_child_ids.contains("HP:0002325"));
        assert_eq!(state.current_refinement_index, 1);
    }

    #[test]
    fn test_skip_then_answer_scenario() {
        let state = reduce(&refining_state(), &DecisionGraphAction::SkipRefinement { index: 0 });
        let state = reduce(
            &state,
            &DecisionGraphAction::SetRefinementChildren {
                phenotype_id: "HP:0001945".into(),
                children: vec![OntologyTerm::new("HP:0011134", "Low-grade fever")],
            },
        );
        let state = reduce(&state, &DecisionGraphAction::answer(1, vec!["HP:0011134".into()]));
        assert_eq!(state.current_refinement_index, 2);
        assert_eq!(state.refined_phenotypes().len(), 1);
        assert!(state.is_refinement_complete());
    }

    #[test]
    fn test_rewind_only_moves_backwards() {
        let state = reduce(&refining_state(), &DecisionGraphAction::SkipRefinement { index: 0 });
        let forward = reduce(&state, &DecisionGraphAction::RewindRefinement { index: 2 });
        assert_eq!(forward.current_refinement_index, 1);
        let back = reduce(&state, &DecisionGraphAction::RewindRefinement { index: 0 });
        assert_eq!(back.current_refinement_index, 0);
        assert!(back.refinement_questions[0].answered);
    }

    #[test]
    fn test_diagnosis_results_set_timestamp_together() {
        let policy = UrgencyPolicy::default();
        let results = vec![DiseaseMatch::scored("MONDO:1", "Migraine", 0.8, vec![], &policy)];
        let state = reduce(
            &DecisionGraphState::default(),
            &DecisionGraphAction::diagnosis_results(results.clone()),
        );
        assert_eq!(state.diagnosis_results, results);
        assert!(state.diagnosis_timestamp.is_some());

        let cleared = reduce(&state, &DecisionGraphAction::diagnosis_results(vec![]));
        assert!(cleared.diagnosis_results.is_empty());
        assert!(cleared.diagnosis_timestamp.is_none());
    }

    #[test]
    fn test_chat_requires_diagnosis() {
        let state = DecisionGraphState::default();
        let msg = ChatMessage::user("What is this?");
        let next = reduce(&state, &DecisionGraphAction::AddChatMessage { message: msg.clone() });
        assert!(next.chat_messages.is_empty());

        let policy = UrgencyPolicy::default();
        let with_results = reduce(
            &state,
            &DecisionGraphAction::diagnosis_results(vec![DiseaseMatch::scored(
                "MONDO:1", "Migraine", 0.5, vec![], &policy,
            )]),
        );
        let next = reduce(&with_results, &DecisionGraphAction::AddChatMessage { message: msg });
        assert_eq!(next.chat_messages.len(), 1);
    }

    #[test]
    fn test_set_error_clears_loading() {
        let state = reduce(
            &DecisionGraphState::default(),
            &DecisionGraphAction::SetLoading { loading: true },
        );
        let state = reduce(&state, &DecisionGraphAction::error("boom"));
        assert!(!state.is_loading);
        assert_eq!(state.error.as_deref(), Some("boom"));
        let state = reduce(&state, &DecisionGraphAction::ClearError);
        assert!(state.error.is_none());
    }

    #[test]
    fn test_patient_info_and_step() {
        let info = PatientInfo::default();
        let state = reduce(
            &DecisionGraphState::default(),
            &DecisionGraphAction::SetPatientInfo {
                info: Some(info.clone()),
            },
        );
        let state = reduce(&state, &DecisionGraphAction::SetStep { step: Step::Refine });
        assert_eq!(state.patient_info, Some(info));
        assert_eq!(state.current_step, Step::Refine);
    }

    #[test]
    fn test_unknown_action_from_log_is_noop() {
        let action: DecisionGraphAction =
            serde_json::from_str(r#"{"type":"SET_THEME"}"#).expect("unknown type parses");
        assert_eq!(action, DecisionGraphAction::Unknown);
        let state = refining_state();
        assert_eq!(reduce(&state, &action), state);
    }

    #[test]
    fn test_replay_matches_sequential_reduce() {
        let actions = vec![
            DecisionGraphAction::AddPhenotype {
                phenotype: phenotype("HP:0002315", "Headache"),
            },
            DecisionGraphAction::SetStep { step: Step::Refine },
            DecisionGraphAction::SetLoading { loading: true },
        ];
        let json = serde_json::to_string(&actions).unwrap();
        let decoded: Vec<DecisionGraphAction> = serde_json::from_str(&json).unwrap();
        let replayed = replay(&decoded);
        assert_eq!(replayed.current_step, Step::Refine);
        assert!(replayed.is_loading);
        assert_eq!(replayed.selected_phenotypes.len(), 1);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(usize),
        Remove(usize),
        Toggle(usize, usize),
        Answer(usize, Vec<usize>),
        Skip(usize),
    }

    const IDS: [&str; 6] = [
        "HP:0002315",
        "HP:0001945",
        "HP:0002325",
        "HP:0002076",
        "HP:0011134",
        "HP:0001250",
    ];

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..IDS.len()).prop_map(Op::Add),
            (0..IDS.len()).prop_map(Op::Remove),
            (0..3usize, 0..IDS.len()).prop_map(|(q, c)| Op::Toggle(q, c)),
            (0..3usize, prop::collection::vec(0..IDS.len(), 0..3))
                .prop_map(|(q, cs)| Op::Answer(q, cs)),
            (0..3usize).prop_map(Op::Skip),
        ]
    }

    fn apply(state: &DecisionGraphState, op: &Op) -> DecisionGraphState {
        let action = match op {
            Op::Add(i) => DecisionGraphAction::AddPhenotype {
                phenotype: phenotype(IDS[*i], IDS[*i]),
            },
            Op::Remove(i) => DecisionGraphAction::RemovePhenotype {
                id: IDS[*i].to_string(),
            },
            Op::Toggle(q, c) => DecisionGraphAction::toggle_child(*q, IDS[*c]),
            Op::Answer(q, cs) => {
                DecisionGraphAction::answer(*q, cs.iter().map(|c| IDS[*c].to_string()).collect())
            }
            Op::Skip(q) => DecisionGraphAction::SkipRefinement { index: *q },
        };
        reduce(state, &action)
    }

    proptest! {
        #[test]
        fn prop_selected_ids_are_unique(adds in prop::collection::vec(0..IDS.len(), 0..40)) {
            let state = adds.iter().fold(DecisionGraphState::default(), |s, i| add(&s, IDS[*i], "x"));
            let mut ids = state.all_phenotype_ids();
            let total = ids.len();
            ids.sort();
            ids.dedup();
            prop_assert_eq!(ids.len(), total);
        }

        #[test]
        fn prop_refinement_selection_stays_consistent(ops in prop::collection::vec(op_strategy(), 0..40)) {
            let mut state = refining_state();
            for op in &ops {
                state = apply(&state, op);
                assert_consistent(&state);
                prop_assert!(state.current_refinement_index <= state.refinement_questions.len());
            }
        }

        #[test]
        fn prop_removing_another_phenotype_keeps_current_question(
            skipped in 0..3usize,
            removed in 0..3usize,
        ) {
            let mut state = three_questions();
            for index in 0..skipped {
                state = reduce(&state, &DecisionGraphAction::SkipRefinement { index });
            }
            let current = state.refinement_questions[skipped].phenotype_id.clone();
            let removed_id = state.refinement_questions[removed].phenotype_id.clone();
            prop_assume!(removed_id != current);

            let state = reduce(&state, &DecisionGraphAction::RemovePhenotype { id: removed_id });
            prop_assert_eq!(
                &state.refinement_questions[state.current_refinement_index].phenotype_id,
                &current
            );
        }

        #[test]
        fn prop_reset_returns_initial_state(ops in prop::collection::vec(op_strategy(), 0..20)) {
            let state = ops.iter().fold(refining_state(), |s, op| apply(&s, op));
            prop_assert_eq!(reduce(&state, &DecisionGraphAction::Reset), DecisionGraphState::default());
        }

        #[test]
        fn prop_sequential_processing_ends_at_len(skips in prop::collection::vec(any::<bool>(), 2)) {
            let mut state = refining_state();
            let mut last = state.current_refinement_index;
            for (i, skip) in skips.iter().enumerate() {
                let action = if *skip {
                    DecisionGraphAction::SkipRefinement { index: i }
                } else {
                    DecisionGraphAction::answer(i, vec![])
                };
                state = reduce(&state, &action);
                prop_assert!(state.current_refinement_index > last);
                last = state.current_refinement_index;
            }
            prop_assert_eq!(state.current_refinement_index, state.refinement_questions.len());
        }
    }
}
