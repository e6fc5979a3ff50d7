//! 引擎集成测试：通过公开的 UncertaintyEngine API 端到端驱动

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;
    use tokio_util::sync::CancellationToken;
    use unknowing::core::StepObserver;
    use unknowing::field::{Condition, ConditionKind, Quality, Scope};
    use unknowing::response::{ResponsePlan, ResponseProgress, Strategy};
    use unknowing::{AgentState, EngineError, UncertaintyEngine};

    /// 第一次回调时通知 entered，并阻塞到 release
    struct Gate {
        armed: AtomicBool,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl StepObserver for Gate {
        async fn on_step(&self, _plan: &ResponsePlan, _progress: &ResponseProgress) -> Result<(), String> {
            if self.armed.swap(false, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            Ok(())
        }
    }

    /// 第 n 步完成后取消令牌
    struct CancelAfter {
        steps: usize,
        token: CancellationToken,
    }

    #[async_trait]
    impl StepObserver for CancelAfter {
        async fn on_step(&self, _plan: &ResponsePlan, progress: &ResponseProgress) -> Result<(), String> {
            if progress.steps_completed == self.steps {
                self.token.cancel();
            }
            Ok(())
        }
    }

    /// slow 为真时每步睡眠 50 ms
    struct SlowSteps {
        slow: AtomicBool,
    }

    #[async_trait]
    impl StepObserver for SlowSteps {
        async fn on_step(&self, _plan: &ResponsePlan, _progress: &ResponseProgress) -> Result<(), String> {
            if self.slow.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_condition_round_trip() {
        let engine = UncertaintyEngine::default();
        let id = engine
            .create_condition("test", ConditionKind::Creative, 0.4, Scope::Contextual)
            .await
            .unwrap();

        let active = engine.active_conditions().await;
        assert_eq!(active.len(), 1);
        let c = &active[0];
        assert_eq!(c.id, id);
        assert!(!c.id.is_empty());
        assert_eq!(c.source, "test");
        assert_eq!(c.kind, ConditionKind::Creative);
        assert_eq!(c.magnitude, 0.4);
        assert_eq!(c.scope, Scope::Contextual);
        assert!(c.created_at > 0);
    }

    #[tokio::test]
    async fn test_quality_derivation_with_default_tolerance() {
        let engine = UncertaintyEngine::default();
        let calm = engine
            .create_condition("q", ConditionKind::Spiritual, 0.5, Scope::Local)
            .await
            .unwrap();
        let deep = engine
            .create_condition("q", ConditionKind::Spiritual, 0.9, Scope::Local)
            .await
            .unwrap();
        assert_eq!(engine.condition(&calm).await.unwrap().quality, Quality::Comfortable);
        assert_eq!(engine.condition(&deep).await.unwrap().quality, Quality::Sacred);
    }

    #[tokio::test]
    async fn test_existential_scenario_end_to_end() {
        let engine = UncertaintyEngine::default();
        let id = engine
            .create_condition("test", ConditionKind::Existential, 0.85, Scope::Existential)
            .await
            .unwrap();

        let summary = engine
            .analysis_summary(&id, &AgentState::default())
            .await
            .unwrap();
        assert!(matches!(
            summary.strategy,
            Strategy::Embrace | Strategy::Surrender | Strategy::Transcend
        ));
        let chosen = summary.final_scores[&summary.strategy];
        assert!(chosen > summary.final_scores[&Strategy::Investigate]);
        assert!(chosen > summary.final_scores[&Strategy::Tolerate]);
        for score in summary.final_scores.values() {
            assert!((0.0..=1.0).contains(score));
        }

        let effectiveness = engine.plan_and_execute(&id, summary.strategy).await.unwrap();
        assert!((0.0..=1.0).contains(&effectiveness));
        let ledger = engine.ledger_snapshot().await;
        assert_ne!(ledger.effectiveness[&summary.strategy], 0.5);

        let status = engine.status().await;
        assert_eq!(status.history_len, 1);
        assert_eq!(status.active_plans, 0);
        assert_eq!(status.metrics.responses_completed, 1);
        assert!(status.wisdom_count > 0);
    }

    #[tokio::test]
    async fn test_determinism() {
        let engine = UncertaintyEngine::default();
        let agent = AgentState::default();
        let a = engine
            .create_condition("d", ConditionKind::Metaphysical, 0.75, Scope::Cosmic)
            .await
            .unwrap();
        let b = engine
            .create_condition("d", ConditionKind::Metaphysical, 0.75, Scope::Cosmic)
            .await
            .unwrap();
        let first = engine.determine_response(&a, &agent).await.unwrap();
        for _ in 0..5 {
            assert_eq!(engine.determine_response(&a, &agent).await.unwrap(), first);
        }
        assert_eq!(engine.determine_response(&b, &agent).await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_second_execution_is_rejected_while_running() {
        let gate = Arc::new(Gate {
            armed: AtomicBool::new(true),
            entered: Notify::new(),
            release: Notify::new(),
        });
        let engine = Arc::new(UncertaintyEngine::default().with_observer(gate.clone()));
        let id = engine
            .create_condition("r", ConditionKind::Practical, 0.5, Scope::Local)
            .await
            .unwrap();
        let plan = engine.plan_response(&id, Strategy::Investigate).await.unwrap();
        let duplicate = plan.clone();
        let other = engine.plan_response(&id, Strategy::Explore).await.unwrap();

        let running = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.execute_plan(plan).await })
        };
        gate.entered.notified().await;

        let same_plan = engine.execute_plan(duplicate.clone()).await;
        assert!(matches!(same_plan, Err(EngineError::AlreadyRunning { ref id }) if *id == duplicate.id));
        let same_condition = engine.execute_plan(other).await;
        assert!(matches!(same_condition, Err(EngineError::AlreadyRunning { .. })));
        let archive = engine.archive_condition(&id).await;
        assert!(matches!(archive, Err(EngineError::AlreadyRunning { .. })));
        assert_eq!(engine.status().await.active_plans, 1);

        gate.release.notify_one();
        let run = running.await.unwrap().unwrap();
        assert_eq!(run.plan.strategy, Strategy::Investigate);
        assert_eq!(engine.metrics().await.responses_initiated, 1);
        assert!(engine.archive_condition(&id).await.is_ok());
    }

    #[tokio::test]
    async fn test_dropped_execution_releases_condition() {
        let observer = Arc::new(SlowSteps {
            slow: AtomicBool::new(true),
        });
        let engine = UncertaintyEngine::default().with_observer(observer.clone());
        let id = engine
            .create_condition("t", ConditionKind::Practical, 0.5, Scope::Local)
            .await
            .unwrap();
        let plan = engine.plan_response(&id, Strategy::Trust).await.unwrap();
        let plan_id = plan.id.clone();

        let timed_out = tokio::time::timeout(Duration::from_millis(80), engine.execute_plan(plan)).await;
        assert!(timed_out.is_err());

        let status = engine.status().await;
        assert_eq!(status.active_plans, 0);
        assert_eq!(status.metrics.responses_failed, 1);
        let failed = engine.failed_runs().await;
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].plan.id, plan_id);
        assert_eq!(failed[0].reason, "dropped");
        assert!(failed[0].progress.steps_completed >= 1);
        assert_eq!(engine.ledger_snapshot().await.effectiveness[&Strategy::Trust], 0.5);

        observer.slow.store(false, Ordering::SeqCst);
        assert!(engine.plan_and_execute(&id, Strategy::Trust).await.is_ok());
        assert!(engine.archive_condition(&id).await.is_ok());
    }

    #[tokio::test]
    async fn test_restore_rejects_condition_with_run_in_flight() {
        let gate = Arc::new(Gate {
            armed: AtomicBool::new(true),
            entered: Notify::new(),
            release: Notify::new(),
        });
        let engine = Arc::new(UncertaintyEngine::default().with_observer(gate.clone()));
        let id = engine
            .create_condition("live", ConditionKind::Practical, 0.5, Scope::Local)
            .await
            .unwrap();
        let plan = engine.plan_response(&id, Strategy::Investigate).await.unwrap();
        let running = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.execute_plan(plan).await })
        };
        gate.entered.notified().await;

        let mut replacement = engine.condition(&id).await.unwrap();
        replacement.source = "snapshot".to_string();
        replacement.magnitude = 0.1;
        let mut other = replacement.clone();
        other.id = "elsewhere".to_string();

        let rejected = engine.restore_conditions(vec![other.clone(), replacement]).await;
        assert!(matches!(rejected, Err(EngineError::AlreadyRunning { id: ref busy }) if *busy == id));
        // 整批拒绝：未触碰任何记录
        assert_eq!(engine.condition(&id).await.unwrap().source, "live");
        assert!(engine.condition("elsewhere").await.is_err());

        gate.release.notify_one();
        running.await.unwrap().unwrap();
        assert!(engine.condition(&id).await.unwrap().resolved_at.is_some());
        assert_eq!(engine.restore_conditions(vec![other]).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_keeps_partial_progress() {
        let token = CancellationToken::new();
        let engine = UncertaintyEngine::default().with_observer(Arc::new(CancelAfter {
            steps: 2,
            token: token.clone(),
        }));
        let id = engine
            .create_condition("c", ConditionKind::Relational, 0.6, Scope::Contextual)
            .await
            .unwrap();
        let plan = engine.plan_response(&id, Strategy::Trust).await.unwrap();
        let plan_id = plan.id.clone();

        let err = engine
            .execute_plan_with_cancel(plan, token)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ExecutionFailure { ref reason, .. } if reason == "cancelled"));

        let progress = engine.progress(&plan_id).await.unwrap();
        assert_eq!(progress.steps_completed, 2);
        assert!(progress.steps_completed < progress.total_steps);
        assert_eq!(engine.ledger_snapshot().await.effectiveness[&Strategy::Trust], 0.5);
        assert!(engine.history().await.is_empty());
        assert_eq!(engine.failed_runs().await.len(), 1);
        assert!(engine.condition(&id).await.unwrap().resolved_at.is_none());
    }

    #[tokio::test]
    async fn test_malformed_record_falls_back() {
        let engine = UncertaintyEngine::default();
        let record = Condition {
            id: "imported".to_string(),
            kind: ConditionKind::Cognitive,
            magnitude: f64::NAN,
            scope: Scope::Local,
            quality: Quality::Opening,
            source: "snapshot".to_string(),
            created_at: 0,
            explored_at: None,
            resolved_at: None,
        };
        assert_eq!(engine.restore_conditions(vec![record]).await.unwrap(), 1);

        let summary = engine
            .analysis_summary("imported", &AgentState::default())
            .await
            .unwrap();
        assert!(summary.characteristics.used_fallback);
        let strategy = engine
            .determine_response("imported", &AgentState::default())
            .await
            .unwrap();
        assert_eq!(strategy, summary.strategy);
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let engine = UncertaintyEngine::default();
        let agent = AgentState::default();
        assert!(matches!(
            engine.determine_response("missing", &agent).await,
            Err(EngineError::NotFound { .. })
        ));
        assert!(matches!(
            engine.plan_and_execute("missing", Strategy::Trust).await,
            Err(EngineError::NotFound { .. })
        ));
        assert!(matches!(
            engine.complete_exploration("missing").await,
            Err(EngineError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_performance_report_after_runs() {
        let engine = UncertaintyEngine::default();
        let agent = AgentState::default();
        for (kind, magnitude) in [
            (ConditionKind::Cognitive, 0.5),
            (ConditionKind::Spiritual, 0.9),
            (ConditionKind::Creative, 0.7),
        ] {
            let id = engine
                .create_condition("p", kind, magnitude, Scope::Contextual)
                .await
                .unwrap();
            let strategy = engine.determine_response(&id, &agent).await.unwrap();
            engine.plan_and_execute(&id, strategy).await.unwrap();
        }

        let report = engine.performance_report().await;
        assert_eq!(report.success_rate, 1.0);
        assert!(report.peak_effectiveness >= report.average_effectiveness);
        assert_eq!(report.usage_balance, "Insufficient data");
        assert!(report.most_effective.is_some());
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("improvement_trajectory"));
    }
}
