//! HTTP adapter exposing integration creation and admin provisioning.

pub struct Server<R, C, S>
where
    R: crate::sts_assume_role::RoleAssumer,
    C: crate::iam_admin::IamConnector,
    S: crate::store::IntegrationStore,
{
    inner: std::sync::Arc<ServerInner<R, C, S>>,
}

impl<R, C, S> Clone for Server<R, C, S>
where
    R: crate::sts_assume_role::RoleAssumer,
    C: crate::iam_admin::IamConnector,
    S: crate::store::IntegrationStore,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct ServerInner<R, C, S>
where
    R: crate::sts_assume_role::RoleAssumer,
    C: crate::iam_admin::IamConnector,
    S: crate::store::IntegrationStore,
{
    orchestrator: crate::orchestrator::Orchestrator<R, C>,
    store: S,
}

impl<R, C, S> std::fmt::Debug for ServerInner<R, C, S>
where
    R: crate::sts_assume_role::RoleAssumer,
    C: crate::iam_admin::IamConnector,
    S: crate::store::IntegrationStore,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerInner")
            .field("orchestrator", &self.orchestrator)
            .finish()
    }
}

impl<R, C, S> ServerInner<R, C, S>
where
    R: crate::sts_assume_role::RoleAssumer,
    C: crate::iam_admin::IamConnector,
    S: crate::store::IntegrationStore,
{
    fn authorize(
        &self,
        bearer: Result<crate::ext_axum::ExtractBearer, crate::ext_axum::ExtractBearerRejection>,
    ) -> Result<(), axum::response::Response> {
        use axum::response::IntoResponse;

        let Some(expected) = self.orchestrator.config().api_token.as_ref() else {
            return Ok(());
        };
        match bearer {
            Ok(crate::ext_axum::ExtractBearer(given))
                if crate::ext_axum::token_matches(expected, &given) =>
            {
                Ok(())
            }
            Ok(_) => {
                tracing::warn!("request with an invalid bearer token rejected");
                Err(ApiError::Unauthorized.into_response())
            }
            Err(rejection) => Err(rejection.into_response()),
        }
    }

    fn provider(&self, given: Option<&str>) -> crate::Result<crate::integration::Provider> {
        match given {
            None => Ok(self.orchestrator.config().provider),
            Some(p) => p.parse(),
        }
    }
}

impl<R, C, S> Server<R, C, S>
where
    R: crate::sts_assume_role::RoleAssumer + 'static,
    C: crate::iam_admin::IamConnector + 'static,
    S: crate::store::IntegrationStore + 'static,
{
    pub fn new(orchestrator: crate::orchestrator::Orchestrator<R, C>, store: S) -> Self {
        Self {
            inner: std::sync::Arc::new(ServerInner {
                orchestrator,
                store,
            }),
        }
    }

    pub fn router(&self) -> axum::Router {
        axum::Router::new()
            .route(
                "/integrations",
                axum::routing::post(handle_create_integration::<R, C, S>),
            )
            .route(
                "/integrations/{integration_id}",
                axum::routing::get(handle_get_integration::<R, C, S>),
            )
            .route(
                "/integrations/{integration_id}/admin",
                axum::routing::post(handle_provision_admin::<R, C, S>),
            )
            .layer(axum::extract::Extension(self.inner.clone()))
    }
}

pub async fn bind_tcp(addr: std::net::SocketAddr) -> crate::Result<tokio::net::TcpListener> {
    let sock = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %sock.local_addr()?, "Listening TCP");
    Ok(sock)
}

/// Errors as seen by HTTP clients.
#[derive(Debug)]
enum ApiError {
    Unauthorized,
    Core(crate::Error),
}

impl From<crate::Error> for ApiError {
    fn from(e: crate::Error) -> ApiError {
        ApiError::Core(e)
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let (code, message) = match &self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_owned()),
            ApiError::Core(e) => match e {
                crate::Error::InvalidInput(_) | crate::Error::UnsupportedProvider(_) => {
                    (StatusCode::BAD_REQUEST, e.to_string())
                }
                crate::Error::IntegrationNotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
                crate::Error::TrustNotEstablished { .. } => {
                    (StatusCode::FAILED_DEPENDENCY, e.to_string())
                }
                crate::Error::ProvisioningFailed => (StatusCode::BAD_GATEWAY, e.to_string()),
                _ => {
                    tracing::error!(err = ?e, "request failed with an internal error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal error".to_owned(),
                    )
                }
            },
        };
        (code, axum::Json(ErrorResponse { error: message })).into_response()
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct CreateIntegrationBody {
    pub provider: Option<String>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct IntegrationResponse {
    pub integration: crate::integration::Integration,
    pub onboarding_url: String,
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct ProvisionAdminBody {
    #[serde(default)]
    pub account_id: String,
    pub provider: Option<String>,
    pub user_name: Option<String>,
    pub group_name: Option<String>,
}

/// The provisioned key pair. Sent once to the caller and never stored.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, zeroize::ZeroizeOnDrop)]
pub struct ProvisionedCredentialsResponse {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl From<&crate::iam_admin::ProvisionedCredentialPair> for ProvisionedCredentialsResponse {
    fn from(pair: &crate::iam_admin::ProvisionedCredentialPair) -> ProvisionedCredentialsResponse {
        use secrecy::ExposeSecret;
        ProvisionedCredentialsResponse {
            access_key_id: pair.access_key_id.clone(),
            secret_access_key: pair.secret_access_key.expose_secret().to_owned(),
        }
    }
}

type Inner<R, C, S> = axum::extract::Extension<std::sync::Arc<ServerInner<R, C, S>>>;

#[tracing::instrument(skip_all)]
async fn handle_create_integration<R, C, S>(
    bearer: Result<crate::ext_axum::ExtractBearer, crate::ext_axum::ExtractBearerRejection>,
    axum::extract::Extension(server): Inner<R, C, S>,
    axum::Json(body): axum::Json<CreateIntegrationBody>,
) -> axum::response::Response
where
    R: crate::sts_assume_role::RoleAssumer + 'static,
    C: crate::iam_admin::IamConnector + 'static,
    S: crate::store::IntegrationStore + 'static,
{
    use axum::response::IntoResponse;

    if let Err(resp) = server.authorize(bearer) {
        return resp;
    }
    let result = async {
        let provider = server.provider(body.provider.as_deref())?;
        let created = server.orchestrator.create_integration(provider)?;
        server.store.save(&created.integration).await?;
        crate::Result::Ok(created)
    }
    .await;

    match result {
        Ok(created) => (
            axum::http::StatusCode::CREATED,
            axum::Json(IntegrationResponse {
                integration: created.integration,
                onboarding_url: created.onboarding_url,
            }),
        )
            .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

#[tracing::instrument(skip_all)]
async fn handle_get_integration<R, C, S>(
    bearer: Result<crate::ext_axum::ExtractBearer, crate::ext_axum::ExtractBearerRejection>,
    axum::extract::Extension(server): Inner<R, C, S>,
    axum::extract::Path(integration_id): axum::extract::Path<String>,
) -> axum::response::Response
where
    R: crate::sts_assume_role::RoleAssumer + 'static,
    C: crate::iam_admin::IamConnector + 'static,
    S: crate::store::IntegrationStore + 'static,
{
    use axum::response::IntoResponse;

    if let Err(resp) = server.authorize(bearer) {
        return resp;
    }
    tracing::debug!(integration_id = %integration_id, "fetching integration");
    let result = async {
        let integration = server.store.load(&integration_id).await?;
        let onboarding_url = server.orchestrator.onboarding_url(&integration)?;
        crate::Result::Ok(IntegrationResponse {
            integration,
            onboarding_url,
        })
    }
    .await;

    match result {
        Ok(r) => axum::Json(r).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

#[tracing::instrument(skip_all)]
async fn handle_provision_admin<R, C, S>(
    bearer: Result<crate::ext_axum::ExtractBearer, crate::ext_axum::ExtractBearerRejection>,
    axum::extract::Extension(server): Inner<R, C, S>,
    axum::extract::Path(integration_id): axum::extract::Path<String>,
    axum::Json(body): axum::Json<ProvisionAdminBody>,
) -> axum::response::Response
where
    R: crate::sts_assume_role::RoleAssumer + 'static,
    C: crate::iam_admin::IamConnector + 'static,
    S: crate::store::IntegrationStore + 'static,
{
    use axum::response::IntoResponse;

    if let Err(resp) = server.authorize(bearer) {
        return resp;
    }
    tracing::debug!(integration_id = %integration_id, "admin provisioning requested");
    let result = async {
        let request = crate::integration::AssumeRoleRequest {
            provider: server.provider(body.provider.as_deref())?,
            integration_id,
            account_id: body.account_id,
            user_name: body.user_name,
            group_name: body.group_name,
        };
        request.validate(server.orchestrator.config().provider)?;
        let integration = server.store.load(&request.integration_id).await?;
        server
            .orchestrator
            .provision_for_integration(&integration, &request)
            .await
    }
    .await;

    match result {
        Ok(pair) => {
            tracing::info!(
                access_key_id = %pair.access_key_id,
                "vending provisioned credentials to client"
            );
            axum::Json(ProvisionedCredentialsResponse::from(&pair)).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}
