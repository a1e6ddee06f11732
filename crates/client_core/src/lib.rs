//! HTTP and WebSocket client for the clinic server, plus the patient-side
//! booking flow. Everything here mirrors the server routes one-to-one; the
//! flow module layers the multi-step booking screens on top.

use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{Appointment, AppointmentId, AppointmentStatus, DepartmentId, HospitalId},
    error::ApiError,
    protocol::{
        BookingConfirmation, BookingRequest, DepartmentSummary, DoctorSummary, HospitalSummary,
        QueueSnapshot, ServerEvent, Session, SortDirection, SortKey,
    },
};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{info, warn};
use url::Url;

mod flow;

pub use flow::{BookingFlow, BookingStep, FlowError, PatientDetails};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("server rejected the request: {0}")]
    Api(#[from] ApiError),
    #[error("transport failure: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid server url: {0}")]
    Url(#[from] url::ParseError),
    #[error("websocket failure: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

#[derive(Debug, Serialize)]
struct PhoneLoginBody<'a> {
    phone: &'a str,
}

#[derive(Debug, Serialize)]
struct CrLoginBody<'a> {
    cr_number: &'a str,
}

#[derive(Debug, Serialize)]
struct StatusUpdateBody {
    status: AppointmentStatus,
}

#[derive(Debug, Serialize)]
struct SerialAdjustBody {
    delta: i32,
}

#[derive(Debug, Serialize)]
struct ListParams<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    q: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sort: Option<SortKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    direction: Option<SortDirection>,
}

/// Thin wrapper over the server's HTTP surface. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ClinicClient {
    http: Client,
    base: Url,
}

impl ClinicClient {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:8080`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base = Url::parse(base_url)?;
        Ok(Self {
            http: Client::new(),
            base,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        // Joining against "host/" keeps any base path segment intact.
        let mut base = self.base.clone();
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        Ok(base.join(path.trim_start_matches('/'))?)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(ClientError::Api(response.json::<ApiError>().await?))
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.http.get(self.endpoint(path)?).send().await?;
        Self::decode(response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self
            .http
            .post(self.endpoint(path)?)
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.http.post(self.endpoint(path)?).send().await?;
        Self::decode(response).await
    }

    pub async fn login_phone(&self, phone: &str) -> Result<Session, ClientError> {
        self.post_json("login/phone", &PhoneLoginBody { phone }).await
    }

    pub async fn login_cr(&self, cr_number: &str) -> Result<Session, ClientError> {
        self.post_json("login/cr", &CrLoginBody { cr_number }).await
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        let response = self.http.post(self.endpoint("logout")?).send().await?;
        if response.status() == StatusCode::NO_CONTENT || response.status().is_success() {
            Ok(())
        } else {
            Err(ClientError::Api(response.json::<ApiError>().await?))
        }
    }

    pub async fn session(&self) -> Result<Session, ClientError> {
        self.get_json("session").await
    }

    pub async fn hospitals(&self) -> Result<Vec<HospitalSummary>, ClientError> {
        self.get_json("hospitals").await
    }

    pub async fn departments(
        &self,
        hospital_id: &HospitalId,
    ) -> Result<Vec<DepartmentSummary>, ClientError> {
        self.get_json(&format!("hospitals/{hospital_id}/departments"))
            .await
    }

    pub async fn doctors(
        &self,
        hospital_id: &HospitalId,
        department_id: &DepartmentId,
    ) -> Result<Vec<DoctorSummary>, ClientError> {
        self.get_json(&format!(
            "hospitals/{hospital_id}/departments/{department_id}/doctors"
        ))
        .await
    }

    pub async fn book(&self, request: &BookingRequest) -> Result<BookingConfirmation, ClientError> {
        self.post_json("appointments", request).await
    }

    pub async fn appointments(
        &self,
        query: Option<&str>,
        sort: Option<(SortKey, SortDirection)>,
    ) -> Result<Vec<Appointment>, ClientError> {
        let params = ListParams {
            q: query,
            sort: sort.map(|(key, _)| key),
            direction: sort.map(|(_, direction)| direction),
        };
        let response = self
            .http
            .get(self.endpoint("appointments")?)
            .query(&params)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn lookup_cr(&self, cr_number: &str) -> Result<Appointment, ClientError> {
        self.get_json(&format!("appointments/cr/{cr_number}")).await
    }

    pub async fn cr_history(&self, cr_number: &str) -> Result<Vec<Appointment>, ClientError> {
        self.get_json(&format!("appointments/cr/{cr_number}/history"))
            .await
    }

    pub async fn queue(&self, serial: u32) -> Result<QueueSnapshot, ClientError> {
        self.get_json(&format!("queue?serial={serial}")).await
    }

    pub async fn upcoming(&self, limit: Option<usize>) -> Result<Vec<Appointment>, ClientError> {
        match limit {
            Some(limit) => self.get_json(&format!("queue/upcoming?limit={limit}")).await,
            None => self.get_json("queue/upcoming").await,
        }
    }

    pub async fn advance_queue(&self) -> Result<ServerEvent, ClientError> {
        self.post_empty("queue/advance").await
    }

    pub async fn retreat_queue(&self) -> Result<ServerEvent, ClientError> {
        self.post_empty("queue/retreat").await
    }

    pub async fn call(&self, appointment_id: &AppointmentId) -> Result<ServerEvent, ClientError> {
        self.post_empty(&format!("appointments/{appointment_id}/call"))
            .await
    }

    pub async fn complete(
        &self,
        appointment_id: &AppointmentId,
    ) -> Result<ServerEvent, ClientError> {
        self.post_empty(&format!("appointments/{appointment_id}/complete"))
            .await
    }

    pub async fn set_status(
        &self,
        appointment_id: &AppointmentId,
        status: AppointmentStatus,
    ) -> Result<ServerEvent, ClientError> {
        self.post_json(
            &format!("appointments/{appointment_id}/status"),
            &StatusUpdateBody { status },
        )
        .await
    }

    pub async fn adjust_serial(
        &self,
        appointment_id: &AppointmentId,
        delta: i32,
    ) -> Result<ServerEvent, ClientError> {
        self.post_json(
            &format!("appointments/{appointment_id}/serial"),
            &SerialAdjustBody { delta },
        )
        .await
    }
}

/// Connects to the server's `/ws` feed and forwards decoded events over a
/// channel. The read loop ends when the receiver is dropped or the socket
/// closes, so callers just drop the receiver to disconnect.
pub async fn subscribe_events(ws_url: &str) -> Result<mpsc::Receiver<ServerEvent>, ClientError> {
    let (stream, _) = connect_async(ws_url).await?;
    let (tx, rx) = mpsc::channel(64);

    tokio::spawn(async move {
        let (_, mut read) = stream.split();
        while let Some(message) = read.next().await {
            let text = match message {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => continue,
            };
            match serde_json::from_str::<ServerEvent>(&text) {
                Ok(event) => {
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
                Err(err) => warn!(%err, "ignoring unparseable event frame"),
            }
        }
        info!("event feed closed");
    });

    Ok(rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_join_cleanly_with_and_without_trailing_slash() {
        let client = ClinicClient::new("http://127.0.0.1:8080").expect("client");
        let url = client.endpoint("hospitals/h1/departments").expect("url");
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/hospitals/h1/departments");

        let client = ClinicClient::new("http://clinic.local/api/").expect("client");
        let url = client.endpoint("/queue/advance").expect("url");
        assert_eq!(url.as_str(), "http://clinic.local/api/queue/advance");
    }

    #[test]
    fn event_frames_decode_into_typed_events() {
        let frame = r#"{"type":"queue_advanced","payload":{"current_serial":4}}"#;
        let event: ServerEvent = serde_json::from_str(frame).expect("event");
        match event {
            ServerEvent::QueueAdvanced { current_serial } => assert_eq!(current_serial, 4),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
