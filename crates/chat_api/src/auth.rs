use crate::client::ChatApiClient;
use crate::error::ChatApiError;
use crate::url::login_url;

impl ChatApiClient {
    /// Exchanges login credentials for an opaque bearer token.
    ///
    /// Any non-2xx response is [`ChatApiError::InvalidCredentials`]:
    /// surfaced synchronously to the caller with no session state
    /// involved. The returned token body is not inspected locally; the
    /// service alone decides validity.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, ChatApiError> {
        let url = login_url(&self.config().base_url, username, password)?;
        let response = self
            .http()
            .post(url)
            .send()
            .await
            .map_err(ChatApiError::from)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatApiError::InvalidCredentials(status));
        }

        let token = response.text().await.map_err(ChatApiError::from)?;
        Ok(token)
    }
}
