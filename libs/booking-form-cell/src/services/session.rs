use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tokio::runtime::Handle;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_scheduling::FrappeClient;

use crate::error::BookingFormError;
use crate::models::{Channel, DepartmentDoctor, FormView, SubmissionResponse, UpdateDetailsRequest};
use crate::services::backend::SchedulingBackend;
use crate::services::form::FormController;
use crate::services::reference::load_reference_data;
use crate::services::submission::book;
use crate::services::verification::{CodeIssuer, MockCodeIssuer, VerificationGate};

pub type FormHandle = Arc<Mutex<FormController>>;

struct Session {
    form: FormHandle,
    /// Milliseconds since the service's epoch.
    last_touched: AtomicU64,
}

/// Clears a form's in-flight submission flag if the submitting request is
/// dropped before the booking outcome is recorded.
struct SubmissionGuard {
    session: Option<FormHandle>,
}

impl SubmissionGuard {
    fn new(session: FormHandle) -> Self {
        Self { session: Some(session) }
    }

    fn disarm(mut self) {
        self.session = None;
    }
}

impl Drop for SubmissionGuard {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        match session.try_lock() {
            Ok(mut form) => form.abandon_submission(),
            Err(_) => {
                if let Ok(runtime) = Handle::try_current() {
                    let session = Arc::clone(&session);
                    runtime.spawn(async move {
                        session.lock().await.abandon_submission();
                    });
                }
            }
        };
    }
}

/// Hosts form sessions and drives their calls to the scheduling backend.
///
/// Backend calls are made without holding the session lock, so a user can
/// keep editing while a slot fetch or booking is in flight. Slot results are
/// tagged and dropped if the doctor changed meanwhile. Idle sessions are
/// evicted whenever a new form is opened.
pub struct BookingFormService {
    config: Arc<AppConfig>,
    backend: Arc<dyn SchedulingBackend>,
    issuer: Arc<dyn CodeIssuer>,
    sessions: RwLock<HashMap<Uuid, Session>>,
    epoch: Instant,
    idle_timeout: Duration,
}

impl BookingFormService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_backend(
            config,
            Arc::new(FrappeClient::new(config)),
            Arc::new(MockCodeIssuer),
        )
    }

    pub fn with_backend(
        config: &AppConfig,
        backend: Arc<dyn SchedulingBackend>,
        issuer: Arc<dyn CodeIssuer>,
    ) -> Self {
        Self {
            config: Arc::new(config.clone()),
            backend,
            issuer,
            sessions: RwLock::new(HashMap::new()),
            epoch: Instant::now(),
            idle_timeout: Duration::from_secs(config.form_session_idle_secs),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn now_millis(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    async fn session(&self, id: Uuid) -> Result<FormHandle, BookingFormError> {
        let sessions = self.sessions.read().await;
        let session = sessions
            .get(&id)
            .ok_or_else(|| BookingFormError::NotFound(id.to_string()))?;
        session.last_touched.store(self.now_millis(), Ordering::Relaxed);
        Ok(session.form.clone())
    }

    /// Drop sessions untouched for longer than the idle timeout. A session
    /// whose form is locked is in use and kept. Returns how many were dropped.
    pub async fn evict_idle_sessions(&self) -> usize {
        let now = self.now_millis();
        let idle_millis = self.idle_timeout.as_millis() as u64;

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, session| {
            let idle = now.saturating_sub(session.last_touched.load(Ordering::Relaxed));
            let keep = idle < idle_millis || session.form.try_lock().is_err();
            if !keep {
                debug!("Evicting idle booking form {}", id);
            }
            keep
        });

        let evicted = before - sessions.len();
        if evicted > 0 {
            info!("Evicted {} idle booking forms", evicted);
        }
        evicted
    }

    /// Open a form: load reference data and register the session.
    #[instrument(skip(self))]
    pub async fn create_form(&self) -> FormView {
        self.evict_idle_sessions().await;

        let reference = load_reference_data(self.backend.as_ref()).await;
        let form = FormController::new(reference, VerificationGate::from_config(&self.config));
        let view = form.view();

        let session = Session {
            form: Arc::new(Mutex::new(form)),
            last_touched: AtomicU64::new(self.now_millis()),
        };
        self.sessions.write().await.insert(view.id, session);
        info!("Opened booking form {}", view.id);

        view
    }

    pub async fn get_form(&self, id: Uuid) -> Result<FormView, BookingFormError> {
        Ok(self.session(id).await?.lock().await.view())
    }

    pub async fn discard_form(&self, id: Uuid) -> Result<(), BookingFormError> {
        self.sessions
            .write()
            .await
            .remove(&id)
            .map(|_| debug!("Discarded booking form {}", id))
            .ok_or_else(|| BookingFormError::NotFound(id.to_string()))
    }

    pub async fn select_department(
        &self,
        id: Uuid,
        department_id: Option<String>,
    ) -> Result<FormView, BookingFormError> {
        let session = self.session(id).await?;
        let mut form = session.lock().await;
        form.select_department(department_id)?;
        Ok(form.view())
    }

    pub async fn select_location(
        &self,
        id: Uuid,
        center_id: Option<String>,
    ) -> Result<FormView, BookingFormError> {
        let session = self.session(id).await?;
        let mut form = session.lock().await;
        form.select_location(center_id)?;
        Ok(form.view())
    }

    /// Select a doctor and load their slots. The response reflects the form
    /// after the fetch, whichever doctor is selected by then.
    #[instrument(skip(self))]
    pub async fn select_doctor(
        &self,
        id: Uuid,
        doctor_id: Option<String>,
    ) -> Result<FormView, BookingFormError> {
        let session = self.session(id).await?;

        let ticket = session.lock().await.select_doctor(doctor_id)?;

        if let Some(ticket) = ticket {
            let result = self.backend.check_available_slots(&ticket.doctor_id).await;
            session.lock().await.apply_slots(&ticket, result);
        }

        let view = session.lock().await.view();
        Ok(view)
    }

    pub async fn select_date(
        &self,
        id: Uuid,
        date: Option<NaiveDate>,
    ) -> Result<FormView, BookingFormError> {
        let session = self.session(id).await?;
        let mut form = session.lock().await;
        form.select_date(date)?;
        Ok(form.view())
    }

    pub async fn select_time(
        &self,
        id: Uuid,
        time: Option<String>,
    ) -> Result<FormView, BookingFormError> {
        let session = self.session(id).await?;
        let mut form = session.lock().await;
        form.select_time(time)?;
        Ok(form.view())
    }

    pub async fn update_details(
        &self,
        id: Uuid,
        request: UpdateDetailsRequest,
    ) -> Result<FormView, BookingFormError> {
        let session = self.session(id).await?;
        let mut form = session.lock().await;
        form.update_details(request);
        Ok(form.view())
    }

    pub async fn request_code(&self, id: Uuid, channel: Channel) -> Result<FormView, BookingFormError> {
        let session = self.session(id).await?;
        let mut form = session.lock().await;
        form.request_code(channel, self.issuer.as_ref()).await?;
        Ok(form.view())
    }

    pub async fn confirm_code(
        &self,
        id: Uuid,
        channel: Channel,
        code: &str,
    ) -> Result<FormView, BookingFormError> {
        let session = self.session(id).await?;
        let mut form = session.lock().await;
        form.confirm_code(channel, code)?;
        Ok(form.view())
    }

    pub async fn cancel_verification(
        &self,
        id: Uuid,
        channel: Channel,
    ) -> Result<FormView, BookingFormError> {
        let session = self.session(id).await?;
        let mut form = session.lock().await;
        form.cancel_verification(channel)?;
        Ok(form.view())
    }

    /// Validate and book. Exactly one backend call is made when validation
    /// passes, none otherwise.
    #[instrument(skip(self))]
    pub async fn submit(&self, id: Uuid) -> Result<SubmissionResponse, BookingFormError> {
        let session = self.session(id).await?;

        let request = session.lock().await.begin_submission()?;
        let guard = SubmissionGuard::new(session.clone());
        let outcome = book(self.backend.as_ref(), &request).await;

        let mut form = session.lock().await;
        guard.disarm();
        let confirmation_id = form.finish_submission(outcome)?;

        Ok(SubmissionResponse {
            confirmation_id,
            appointment_slot: request.appointment_slot,
            form: form.view(),
        })
    }

    pub async fn doctors_by_department(
        &self,
        dept_id: &str,
    ) -> Result<Vec<DepartmentDoctor>, BookingFormError> {
        self.backend
            .get_doctors_by_department(dept_id)
            .await
            .map_err(|e| BookingFormError::Backend(e.to_string()))
    }
}
