//! db 없이 드라이버를 검증하기 위한 스크립트 연결 관리자

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use inrix_partition_error::{PartitionError, Result, db_err, operational_err};

use crate::session::{Connector, PartitionSession};

/// 실행 또는 연결 시도 한 번의 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Ok,
    Operational,
    Timeout,
    Fatal,
    Duplicate,
}

impl Step {
    fn into_result(self) -> Result<()> {
        match self {
            Step::Ok => Ok(()),
            Step::Operational => Err(operational_err("server closed the connection unexpectedly")),
            Step::Timeout => Err(PartitionError::Timeout("statement".to_string())),
            Step::Fatal => Err(db_err("syntax error at or near \"CHEK\"")),
            Step::Duplicate => Err(PartitionError::DuplicateConstraint(
                "constraint already exists".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedState {
    /// 성공한 연결 수
    pub connects: usize,
    pub closes: usize,
    /// 실행 시도한 문장 (실패 포함)
    pub attempts: Vec<String>,
    /// 성공한 문장
    pub executed: Vec<String>,
    script: VecDeque<Step>,
    connect_script: VecDeque<Step>,
}

#[derive(Clone)]
pub(crate) struct ScriptedConnector {
    state: Arc<Mutex<ScriptedState>>,
}

impl ScriptedConnector {
    /// 실행 결과 스크립트. 스크립트가 끝나면 모두 성공
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptedState {
                script: script.into(),
                ..ScriptedState::default()
            })),
        }
    }

    /// 연결 시도 결과 스크립트
    pub fn with_connect_script(self, steps: Vec<Step>) -> Self {
        self.state.lock().unwrap().connect_script = steps.into();
        self
    }

    pub fn snapshot(&self) -> ScriptedState {
        self.state.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Session = ScriptedSession;

    async fn connect(&self) -> Result<ScriptedSession> {
        let mut state = self.state.lock().unwrap();
        state.connect_script.pop_front().unwrap_or(Step::Ok).into_result()?;
        state.connects += 1;

        Ok(ScriptedSession {
            state: Arc::clone(&self.state),
        })
    }

    fn target(&self) -> String {
        "scripted:5432/inrix".to_string()
    }
}

pub(crate) struct ScriptedSession {
    state: Arc<Mutex<ScriptedState>>,
}

#[async_trait]
impl PartitionSession for ScriptedSession {
    async fn execute(&mut self, statement: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.attempts.push(statement.to_string());
        state.script.pop_front().unwrap_or(Step::Ok).into_result()?;
        state.executed.push(statement.to_string());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.state.lock().unwrap().closes += 1;
        Ok(())
    }
}
