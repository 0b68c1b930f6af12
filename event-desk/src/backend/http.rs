use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::dto::{
    EventStatsResponse, LoginRequest, LoginResponse, ManagedEventRow, ProfileCompletedResponse,
    RegisterEventRequest,
};
use super::Backend;
use crate::config::Config;
use crate::eligibility::EligibilityFacts;
use crate::error::AppError;
use crate::roster::{EventId, ManagedEvent, RosterSnapshot, StatusUpdate};
use crate::session::UserSession;

pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.backend_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, req: RequestBuilder, session: &UserSession) -> RequestBuilder {
        req.bearer_auth(&session.token)
    }

    async fn check(resp: Response) -> Result<Response, AppError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(AppError::Unauthorized);
        }

        let body = resp.text().await.unwrap_or_default();
        Err(AppError::BackendStatus {
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, AppError> {
        let bytes = Self::check(resp).await?.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| AppError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Backend for HttpBackend {
    #[instrument(skip(self, password))]
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, AppError> {
        let resp = self
            .client
            .post(self.url("/auth/login"))
            .json(&LoginRequest { username, password })
            .send()
            .await?;
        Self::decode(resp).await
    }

    #[instrument(skip(self, session), fields(user_id = session.user_id))]
    async fn eligibility(
        &self,
        session: &UserSession,
        event_id: EventId,
    ) -> Result<EligibilityFacts, AppError> {
        let path = format!("/Student/GetprofileCompleted/{}/{}", session.user_id, event_id);
        let resp = self
            .authed(self.client.get(self.url(&path)), session)
            .send()
            .await?;
        let body: ProfileCompletedResponse = Self::decode(resp).await?;
        Ok(body.into())
    }

    #[instrument(skip_all, fields(user_id = session.user_id, event_id = %request.eventid))]
    async fn register(
        &self,
        session: &UserSession,
        request: &RegisterEventRequest,
    ) -> Result<(), AppError> {
        let resp = self
            .authed(self.client.post(self.url("/Student/RegisterEvent")), session)
            .json(request)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    #[instrument(skip(self, session))]
    async fn event_roster(
        &self,
        session: &UserSession,
        event_id: EventId,
    ) -> Result<RosterSnapshot, AppError> {
        let path = format!("/SER/getEventstats/{event_id}");
        let resp = self
            .authed(self.client.get(self.url(&path)), session)
            .send()
            .await?;
        let body: EventStatsResponse = Self::decode(resp).await?;
        debug!(students = body.students.len(), "roster fetched");
        Ok(body.into())
    }

    #[instrument(skip(self, session), fields(user_id = session.user_id))]
    async fn managed_events(&self, session: &UserSession) -> Result<Vec<ManagedEvent>, AppError> {
        let path = format!("/SER/getstats/{}", session.user_id);
        let resp = self
            .authed(self.client.get(self.url(&path)), session)
            .send()
            .await?;
        let rows: Vec<ManagedEventRow> = Self::decode(resp).await?;
        Ok(rows.into_iter().map(ManagedEvent::from).collect())
    }

    #[instrument(skip(self, session, updates), fields(entries = updates.len()))]
    async fn save_statuses(
        &self,
        session: &UserSession,
        event_id: EventId,
        updates: &[StatusUpdate],
    ) -> Result<(), AppError> {
        let path = format!("/SER/saveEventstats/{event_id}/save");
        let resp = self
            .authed(self.client.patch(self.url(&path)), session)
            .json(updates)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }
}
