use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use apim_sdk::{Caller, DEFAULT_TENANT, ROLE_ADMIN};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::api::models::ErrorResponse;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: u64,
    pub iat: u64,
    /// Tenant domain; tokens without one act in the default tenant.
    #[serde(default)]
    pub tenant: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl Claims {
    pub fn new(subject: &str, tenant: &str, roles: Vec<String>, ttl_secs: u64) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        Self {
            sub: subject.to_string(),
            exp: now + ttl_secs,
            iat: now,
            tenant: Some(tenant.to_string()),
            roles,
            iss: None,
        }
    }
}

/// Identity of the caller, carried through the entire request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub tenant: String,
    pub user_id: String,
    pub roles: Vec<String>,
}

impl RequestContext {
    /// Context used when authentication is disabled.
    #[must_use]
    pub fn anonymous_admin() -> Self {
        Self {
            tenant: DEFAULT_TENANT.to_string(),
            user_id: ROLE_ADMIN.to_string(),
            roles: vec![ROLE_ADMIN.to_string()],
        }
    }

    #[must_use]
    pub fn caller(&self) -> Caller {
        Caller::new(self.tenant.clone(), self.user_id.clone(), self.roles.clone())
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl From<Claims> for RequestContext {
    fn from(claims: Claims) -> Self {
        Self {
            tenant: claims
                .tenant
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_TENANT.to_string()),
            user_id: claims.sub,
            roles: claims.roles,
        }
    }
}

#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: None,
            audience: None,
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
    }

    pub fn decode(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::default();
        let mut required = vec!["exp"];

        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
            required.push("iss");
        }

        if let Some(audience) = &self.audience {
            validation.set_audience(&[audience]);
            required.push("aud");
        }

        // Configured issuer and audience claims are mandatory.
        validation.set_required_spec_claims(&required);

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )?;

        Ok(token_data.claims)
    }
}

#[derive(Clone)]
pub struct AuthState {
    pub enabled: bool,
    pub config: JwtConfig,
}

impl AuthState {
    pub fn new(enabled: bool, config: JwtConfig) -> Self {
        Self { enabled, config }
    }

    /// Every request runs as an admin of the default tenant.
    pub fn disabled() -> Self {
        Self::new(false, JwtConfig::new(""))
    }
}

pub async fn auth_middleware(
    State(auth): State<AuthState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !auth.enabled {
        return run_as(RequestContext::anonymous_admin(), request, next).await;
    }

    if request.uri().path() == "/health" {
        let ctx = RequestContext {
            tenant: DEFAULT_TENANT.to_string(),
            user_id: "anonymous".to_string(),
            roles: Vec::new(),
        };
        return run_as(ctx, request, next).await;
    }

    let token = match request.headers().get(header::AUTHORIZATION) {
        Some(value) => {
            let Ok(value) = value.to_str() else {
                return unauthorized("Invalid Authorization header");
            };
            match value.strip_prefix("Bearer ") {
                Some(token) => token.to_string(),
                None => return unauthorized("Authorization header must use Bearer scheme"),
            }
        }
        None => return unauthorized("Missing Authorization header"),
    };

    match auth.config.decode(&token) {
        Ok(claims) => {
            let ctx = RequestContext::from(claims);
            tracing::debug!(tenant = %ctx.tenant, user = %ctx.user_id, "Authenticated request");
            run_as(ctx, request, next).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "Rejected bearer token");
            unauthorized(&format!("Invalid token: {e}"))
        }
    }
}

/// Run the request as `ctx`, which is also attached to the response for outer layers.
async fn run_as(ctx: RequestContext, mut request: Request<Body>, next: Next) -> Response {
    request.extensions_mut().insert(ctx.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: message.to_string(),
            code: 401,
        }),
    )
        .into_response()
}
