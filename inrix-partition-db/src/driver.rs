use log::{debug, error, info};

use inrix_partition_config::Settings;
use inrix_partition_error::{PartitionError, Result, internal_err};

use crate::applier::{ApplyOutcome, ConstraintApplier};
use crate::partition::labels;
use crate::retry::RetryPolicy;
use crate::session::{Connector, PartitionSession};

/// 실행 결과 요약
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// 제약조건을 추가한 파티션 수
    pub applied: usize,
    /// 이미 제약조건이 있던 파티션 수
    pub skipped: usize,
    /// 재연결 후 재시도 횟수
    pub retries: usize,
}

/// calendar 의 모든 파티션에 제약조건 추가
///
/// 연결 에러가 나면 세션을 새로 만들고 같은 파티션을 처음부터 다시 시도한다.
/// 실패한 시도가 서버에서 커밋됐을 수 있으므로, 재시도에서 만난 중복 제약조건은
/// 추가된 것으로 센다. 그 외 에러는 바로 반환한다.
pub async fn run_partitioning<C: Connector>(settings: &Settings, connector: &C) -> Result<RunSummary> {
    let applier = ConstraintApplier::new(&settings.partition.target)?;
    let policy = RetryPolicy::from(&settings.database.retry);
    let labels = labels(&settings.partition.calendar)?;

    info!("{} 개 파티션 제약조건 추가 시작", labels.len());

    let mut session: Option<C::Session> = None;
    let mut summary = RunSummary::default();

    for label in &labels {
        let mut failures = 0;
        // 이전 시도의 ALTER TABLE 이 서버에 전달됐는지 여부
        let mut sent_before = false;
        loop {
            let result = match open_session(connector, &mut session).await {
                Ok(active) => {
                    let result = applier.apply(active, label).await;
                    if matches!(&result, Err(e) if e.is_transient()) {
                        sent_before = true;
                    }
                    result
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(ApplyOutcome::Applied) => {
                    summary.applied += 1;
                    break;
                }
                Ok(ApplyOutcome::AlreadyPresent) if sent_before => {
                    info!("{} 파티션 제약조건은 이전 시도에서 추가됨", label);
                    summary.applied += 1;
                    break;
                }
                Ok(ApplyOutcome::AlreadyPresent) => {
                    summary.skipped += 1;
                    break;
                }
                Err(PartitionError::DuplicateConstraint(_)) if sent_before => {
                    info!("{} 파티션 제약조건은 이전 시도에서 추가됨", label);
                    summary.applied += 1;
                    break;
                }
                Err(e) if e.is_transient() => {
                    failures += 1;
                    error!(
                        "{} 파티션 처리 중 연결 에러 ({}/{}): {}",
                        label, failures, policy.max_attempts, e
                    );

                    // 기존 세션은 통째로 버린다
                    session = None;

                    if failures >= policy.max_attempts {
                        return Err(PartitionError::RetryExhausted {
                            partition: label.yyyymm(),
                            attempts: failures,
                            last_error: e.to_string(),
                        });
                    }

                    let delay = policy.backoff(failures);
                    debug!("{:?} 후 재연결", delay);
                    tokio::time::sleep(delay).await;
                    summary.retries += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    info!(
        "파티셔닝 완료 (추가 {}, 건너뜀 {}, 재시도 {}), {} 연결 종료",
        summary.applied,
        summary.skipped,
        summary.retries,
        connector.target()
    );
    if let Some(mut session) = session.take() {
        session.close().await?;
    }

    Ok(summary)
}

/// 세션이 없으면 새로 연결
async fn open_session<'a, C: Connector>(
    connector: &C,
    slot: &'a mut Option<C::Session>,
) -> Result<&'a mut C::Session> {
    if slot.is_none() {
        *slot = Some(connector.connect().await?);
    }
    slot.as_mut().ok_or_else(|| internal_err("세션 없음"))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use inrix_partition_config::{Calendar, Settings};

    use super::*;
    use crate::test_support::{ScriptedConnector, Step};

    fn settings(calendar: BTreeMap<i32, Vec<u32>>, max_attempts: u32) -> Settings {
        let mut settings = Settings::default();
        settings.partition.calendar = Calendar::new(calendar).unwrap();
        settings.database.retry.max_attempts = max_attempts;
        settings.database.retry.initial_backoff_ms = 0;
        settings.database.retry.max_backoff_ms = 0;
        settings
    }

    fn tables(statements: &[String]) -> Vec<String> {
        statements
            .iter()
            .map(|sql| {
                let start = sql.find("raw_data").unwrap();
                sql[start..start + "raw_data".len() + 6].to_string()
            })
            .collect()
    }

    #[tokio::test]
    async fn one_statement_per_partition() {
        let settings = settings(BTreeMap::from([(2020, vec![1, 2])]), 3);
        let connector = ScriptedConnector::new(vec![]);

        let summary = run_partitioning(&settings, &connector).await.unwrap();
        let state = connector.snapshot();

        assert_eq!(summary, RunSummary { applied: 2, skipped: 0, retries: 0 });
        assert_eq!(state.connects, 1);
        assert_eq!(state.closes, 1);
        assert_eq!(tables(&state.executed), vec!["raw_data202001", "raw_data202002"]);
        assert!(state.executed[0].contains("DATE '2020-01-01'"));
        assert!(state.executed[1].contains("DATE '2020-02-01'"));
    }

    #[tokio::test]
    async fn default_calendar_issues_one_statement_each() {
        let settings = Settings::default();
        let connector = ScriptedConnector::new(vec![]);

        let summary = run_partitioning(&settings, &connector).await.unwrap();
        let state = connector.snapshot();

        assert_eq!(summary.applied, settings.partition.calendar.len());
        assert_eq!(state.executed.len(), settings.partition.calendar.len());
        assert_eq!(state.closes, 1);
    }

    #[tokio::test]
    async fn operational_failure_retries_same_partition() {
        let settings = settings(BTreeMap::from([(2014, vec![1, 2, 3])]), 5);
        // 두 번째 파티션에서 연결이 끊김
        let connector = ScriptedConnector::new(vec![Step::Ok, Step::Operational, Step::Timeout]);

        let summary = run_partitioning(&settings, &connector).await.unwrap();
        let state = connector.snapshot();

        assert_eq!(summary.applied, 3);
        assert_eq!(summary.retries, 2);
        assert_eq!(state.connects, 3);
        assert_eq!(state.closes, 1);
        assert_eq!(
            tables(&state.attempts),
            vec![
                "raw_data201401",
                "raw_data201402",
                "raw_data201402",
                "raw_data201402",
                "raw_data201403",
            ]
        );
        assert_eq!(
            tables(&state.executed),
            vec!["raw_data201401", "raw_data201402", "raw_data201403"]
        );
    }

    #[tokio::test]
    async fn failed_reconnect_counts_as_attempt() {
        let settings = settings(BTreeMap::from([(2015, vec![6])]), 4);
        let connector = ScriptedConnector::new(vec![Step::Operational])
            .with_connect_script(vec![Step::Ok, Step::Operational]);

        let summary = run_partitioning(&settings, &connector).await.unwrap();
        let state = connector.snapshot();

        assert_eq!(summary.applied, 1);
        assert_eq!(summary.retries, 2);
        assert_eq!(state.connects, 2);
        assert_eq!(state.attempts.len(), 2);
        assert_eq!(state.closes, 1);
    }

    #[tokio::test]
    async fn exhausted_retries_stop_the_run() {
        let settings = settings(BTreeMap::from([(2016, vec![1, 2])]), 3);
        let connector =
            ScriptedConnector::new(vec![Step::Operational, Step::Operational, Step::Operational]);

        let err = run_partitioning(&settings, &connector).await.unwrap_err();
        let state = connector.snapshot();

        match err {
            PartitionError::RetryExhausted {
                partition,
                attempts,
                ..
            } => {
                assert_eq!(partition, "201601");
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(state.attempts.len(), 3);
        assert!(state.executed.is_empty());
        assert_eq!(state.closes, 0);
    }

    #[tokio::test]
    async fn initial_connection_uses_retry_policy() {
        let settings = settings(BTreeMap::from([(2013, vec![1])]), 3);
        let connector = ScriptedConnector::new(vec![])
            .with_connect_script(vec![Step::Operational, Step::Operational, Step::Operational]);

        let err = run_partitioning(&settings, &connector).await.unwrap_err();
        assert!(matches!(err, PartitionError::RetryExhausted { attempts: 3, .. }));
        assert!(connector.snapshot().attempts.is_empty());
    }

    #[tokio::test]
    async fn fatal_error_propagates_without_reconnect() {
        let settings = settings(BTreeMap::from([(2012, vec![7, 8, 9])]), 5);
        let connector = ScriptedConnector::new(vec![Step::Ok, Step::Fatal]);

        let err = run_partitioning(&settings, &connector).await.unwrap_err();
        let state = connector.snapshot();

        assert!(matches!(err, PartitionError::Database(_)));
        assert_eq!(state.connects, 1);
        assert_eq!(state.attempts.len(), 2);
        assert_eq!(state.executed.len(), 1);
    }

    #[tokio::test]
    async fn existing_constraints_are_counted_as_skipped() {
        let settings = settings(BTreeMap::from([(2012, vec![7, 8])]), 2);
        let connector = ScriptedConnector::new(vec![Step::Duplicate]);

        let summary = run_partitioning(&settings, &connector).await.unwrap();
        assert_eq!(summary, RunSummary { applied: 1, skipped: 1, retries: 0 });
        assert_eq!(connector.snapshot().closes, 1);
    }

    #[tokio::test]
    async fn existing_constraint_is_fatal_when_configured() {
        let mut settings = settings(BTreeMap::from([(2012, vec![7, 8])]), 2);
        settings.partition.target.skip_existing = false;
        let connector = ScriptedConnector::new(vec![Step::Duplicate]);

        let err = run_partitioning(&settings, &connector).await.unwrap_err();
        assert!(matches!(err, PartitionError::DuplicateConstraint(_)));
        assert_eq!(connector.snapshot().attempts.len(), 1);
    }

    #[tokio::test]
    async fn constraint_committed_by_timed_out_attempt_counts_as_applied() {
        let mut settings = settings(BTreeMap::from([(2014, vec![5, 6])]), 3);
        settings.partition.target.skip_existing = false;
        // 첫 시도는 타임아웃이지만 서버에서 커밋됨
        let connector = ScriptedConnector::new(vec![Step::Timeout, Step::Duplicate]);

        let summary = run_partitioning(&settings, &connector).await.unwrap();
        let state = connector.snapshot();

        assert_eq!(summary, RunSummary { applied: 2, skipped: 0, retries: 1 });
        assert_eq!(
            tables(&state.attempts),
            vec!["raw_data201405", "raw_data201405", "raw_data201406"]
        );
        assert_eq!(state.closes, 1);
    }

    #[tokio::test]
    async fn duplicate_after_timeout_is_not_counted_as_skipped() {
        let settings = settings(BTreeMap::from([(2014, vec![5])]), 3);
        let connector = ScriptedConnector::new(vec![Step::Timeout, Step::Duplicate]);

        let summary = run_partitioning(&settings, &connector).await.unwrap();
        assert_eq!(summary, RunSummary { applied: 1, skipped: 0, retries: 1 });
    }

    #[tokio::test]
    async fn duplicate_after_failed_connect_is_still_skipped() {
        let settings = settings(BTreeMap::from([(2014, vec![5])]), 3);
        // 문장을 보내기 전에 실패했으므로 기존 제약조건
        let connector = ScriptedConnector::new(vec![Step::Duplicate])
            .with_connect_script(vec![Step::Operational]);

        let summary = run_partitioning(&settings, &connector).await.unwrap();
        assert_eq!(summary, RunSummary { applied: 0, skipped: 1, retries: 1 });
    }

    #[tokio::test]
    async fn invalid_target_fails_before_connecting() {
        let mut settings = settings(BTreeMap::from([(2012, vec![7])]), 2);
        settings.partition.target.schema = "inrix\"; --".to_string();
        let connector = ScriptedConnector::new(vec![]);

        let err = run_partitioning(&settings, &connector).await.unwrap_err();
        assert!(matches!(err, PartitionError::InvalidIdentifier(_)));
        assert_eq!(connector.snapshot().connects, 0);
    }
}
