use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use tokio::task::JoinHandle;
use tokio_postgres::error::SqlState;
use tokio_postgres::{
    Client, NoTls,
    config::{Config, SslMode},
};

use inrix_partition_config::DbConfig;
use inrix_partition_error::{PartitionError, Result, internal_err, operational_err};

/// 제약조건 DDL 을 실행할 db 세션
#[async_trait]
pub trait PartitionSession: Send {
    /// 문장 하나를 autocommit 으로 실행
    ///
    /// 같은 이름의 제약조건이 있으면 `DuplicateConstraint` 를 반환한다.
    async fn execute(&mut self, statement: &str) -> Result<()>;

    /// 세션 종료
    async fn close(&mut self) -> Result<()>;
}

/// 새 세션을 만드는 연결 관리자
#[async_trait]
pub trait Connector: Send + Sync {
    type Session: PartitionSession;

    async fn connect(&self) -> Result<Self::Session>;

    /// 로그용 접속 대상 (`host:port/database`)
    fn target(&self) -> String;
}

/// 서버 statement_timeout 이 먼저 걸리도록 클라이언트 타임아웃에 더하는 여유
const CLIENT_TIMEOUT_GRACE: Duration = Duration::from_secs(30);

/// `PostgreSQL` 연결 관리자
pub struct PgConnector {
    pg_config: Config,
    statement_timeout: Duration,
    target: String,
}

impl PgConnector {
    pub fn new(dbconfig: &DbConfig) -> Self {
        Self {
            pg_config: Self::create_pg_config(dbconfig),
            statement_timeout: Duration::from_secs(dbconfig.session.statement_timeout_seconds)
                + CLIENT_TIMEOUT_GRACE,
            target: format!(
                "{}:{}/{}",
                dbconfig.connection.host, dbconfig.connection.port, dbconfig.connection.database
            ),
        }
    }

    /// `PostgreSQL` 설정 생성
    fn create_pg_config(dbconfig: &DbConfig) -> Config {
        let ssl_mode = match dbconfig.connection.sslmode.to_lowercase().as_str() {
            "disable" => SslMode::Disable,
            "require" => SslMode::Require,
            _ => SslMode::Prefer,
        };

        let mut pg_config = Config::new();
        pg_config
            .host(dbconfig.connection.host.as_str())
            .port(dbconfig.connection.port)
            .dbname(dbconfig.connection.database.as_str())
            .user(dbconfig.connection.user.as_str())
            .password(dbconfig.connection.password.as_str())
            .ssl_mode(ssl_mode)
            .application_name("inrix-partition")
            // 타임아웃은 서버에서 걸어야 ALTER TABLE 이 롤백되고 락이 풀린다
            .options(&format!(
                "-c statement_timeout={}s",
                dbconfig.session.statement_timeout_seconds
            ))
            .connect_timeout(Duration::from_secs(
                dbconfig.session.connection_timeout_seconds,
            ))
            .keepalives(true);

        pg_config
    }
}

#[async_trait]
impl Connector for PgConnector {
    type Session = PgSession;

    async fn connect(&self) -> Result<PgSession> {
        debug!("db 연결 시도: {}", self.target);
        let (client, connection) = self.pg_config.connect(NoTls).await?;

        // 연결 처리 태스크
        let target = self.target.clone();
        let connection = tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("db 연결 종료 ({}): {}", target, e);
            }
        });

        info!("db 연결 완료: {}", self.target);
        Ok(PgSession {
            client: Some(client),
            connection: Some(connection),
            statement_timeout: self.statement_timeout,
        })
    }

    fn target(&self) -> String {
        self.target.clone()
    }
}

/// `PostgreSQL` 세션
///
/// 트랜잭션을 열지 않으므로 각 문장은 autocommit 으로 실행된다.
pub struct PgSession {
    client: Option<Client>,
    connection: Option<JoinHandle<()>>,
    statement_timeout: Duration,
}

#[async_trait]
impl PartitionSession for PgSession {
    async fn execute(&mut self, statement: &str) -> Result<()> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| operational_err("이미 닫힌 세션"))?;

        match tokio::time::timeout(self.statement_timeout, client.batch_execute(statement)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) if e.code() == Some(&SqlState::DUPLICATE_OBJECT) => {
                Err(PartitionError::DuplicateConstraint(e.to_string()))
            }
            Ok(Err(e)) => Err(e.into()),
            Err(elapsed) => {
                // 서버에서 계속 실행되지 않도록 취소 요청
                if let Err(e) = client.cancel_token().cancel_query(NoTls).await {
                    warn!("쿼리 취소 요청 실패: {}", e);
                }
                Err(elapsed.into())
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        // client 를 먼저 버려야 연결 태스크가 끝난다
        drop(self.client.take());
        if let Some(connection) = self.connection.take() {
            connection.await.map_err(internal_err)?;
        }
        Ok(())
    }
}
