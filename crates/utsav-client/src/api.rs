use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use utsav_types::api::{
    CheckInRequest, CheckInResponse, LoginRequest, LoginResponse, RegistrationSummary, RevokeRequest,
    SignupRequest, SignupResponse, StatusMessage, TicketResponse,
};
use utsav_types::models::{Event, Profile, Registration};

use crate::auth::{AuthContext, SessionUser};
use crate::error::ClientError;

/// A ticket together with its QR image, rendered locally from the id.
#[derive(Debug, Clone)]
pub struct TicketView {
    pub ticket: TicketResponse,
    pub qr_data_url: String,
}

/// HTTP client for the festival API. Authenticated calls use the token held
/// in the shared [`AuthContext`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    auth: AuthContext,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, auth: AuthContext) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: Client::new(),
            base_url,
            auth,
        }
    }

    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    // -- Session --

    pub async fn signup(&self, email: &str, password: &str, full_name: &str) -> Result<Profile, ClientError> {
        let body = SignupRequest {
            email: email.to_string(),
            password: password.to_string(),
            full_name: full_name.to_string(),
        };
        self.auth.begin_loading();
        let result = async {
            let resp: SignupResponse = decode(self.http.post(self.url("/auth/signup")).json(&body)).await?;
            self.auth.set_user(SessionUser {
                id: resp.user_id,
                email: body.email.trim().to_lowercase(),
                token: resp.token,
            });
            self.refresh_profile().await
        }
        .await;
        self.auth.finish_loading();
        result
    }

    /// Signs in and loads the profile into the auth context.
    pub async fn login(&self, email: &str, password: &str) -> Result<Profile, ClientError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.auth.begin_loading();
        let result = async {
            let resp: LoginResponse = decode(self.http.post(self.url("/auth/login")).json(&body)).await?;
            self.auth.set_user(SessionUser {
                id: resp.user_id,
                email: resp.email,
                token: resp.token,
            });
            self.refresh_profile().await
        }
        .await;
        self.auth.finish_loading();

        if let Ok(profile) = &result {
            info!(user_id = %profile.id, role = profile.role.as_str(), "Signed in");
        }
        result
    }

    pub fn sign_out(&self) {
        self.auth.sign_out();
    }

    pub async fn refresh_profile(&self) -> Result<Profile, ClientError> {
        let profile: Profile = decode(self.authed(self.http.get(self.url("/api/profile")))?).await?;
        self.auth.set_profile(profile.clone());
        Ok(profile)
    }

    // -- Events and registrations --

    pub async fn events(&self) -> Result<Vec<Event>, ClientError> {
        decode(self.http.get(self.url("/events"))).await
    }

    pub async fn register(&self, event_id: i64) -> Result<Registration, ClientError> {
        let url = self.url(&format!("/events/{event_id}/register"));
        decode(self.authed(self.http.post(url))?).await
    }

    pub async fn my_registrations(&self) -> Result<Vec<RegistrationSummary>, ClientError> {
        decode(self.authed(self.http.get(self.url("/registrations")))?).await
    }

    pub async fn ticket(&self, registration_id: i64) -> Result<TicketView, ClientError> {
        let url = self.url(&format!("/registrations/{registration_id}"));
        let ticket: TicketResponse = decode(self.authed(self.http.get(url))?).await?;
        let qr_data_url = utsav_ticket::data_url(ticket.id)?;
        Ok(TicketView { ticket, qr_data_url })
    }

    pub async fn revoke(&self, registration_id: i64) -> Result<StatusMessage, ClientError> {
        let req = self
            .http
            .delete(self.url("/api/registrations/revoke"))
            .json(&RevokeRequest { registration_id });
        decode(self.authed(req)?).await
    }

    // -- Check-in --

    /// Submits a scanned payload. Handled refusals come back as `Ok` with
    /// `success == false`; the body is read whatever the status code.
    pub async fn check_in(&self, payload: &str) -> Result<CheckInResponse, ClientError> {
        let user = self.auth.user().ok_or(ClientError::NotSignedIn)?;
        let body = CheckInRequest {
            registration_id: payload.trim().to_string(),
            admin_user_id: Some(user.id.to_string()),
        };

        let resp = self
            .http
            .post(self.url("/api/checkin"))
            .bearer_auth(&user.token)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        match serde_json::from_slice::<CheckInResponse>(&bytes) {
            Ok(answer) => {
                debug!(status = status.as_u16(), success = answer.success, "Check-in answered");
                Ok(answer)
            }
            Err(e) => {
                warn!(status = status.as_u16(), "Unreadable check-in response: {}", e);
                Err(ClientError::Status {
                    status: status.as_u16(),
                    message: status.canonical_reason().unwrap_or("Unexpected response").to_string(),
                })
            }
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, req: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let user = self.auth.user().ok_or(ClientError::NotSignedIn)?;
        Ok(req.bearer_auth(user.token))
    }
}

async fn decode<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, ClientError> {
    let resp = req.send().await?;
    if resp.status().is_success() {
        return Ok(resp.json().await?);
    }
    Err(status_error(resp).await)
}

async fn status_error(resp: Response) -> ClientError {
    let status = resp.status();
    let message = match resp.json::<StatusMessage>().await {
        Ok(body) => body.message,
        Err(_) => status.canonical_reason().unwrap_or("Request failed").to_string(),
    };
    ClientError::Status {
        status: status.as_u16(),
        message,
    }
}
