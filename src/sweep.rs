//! End-to-end sweeps: factory, auth provider, hooks and dispatcher together.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::auth::{AuthProvider, NoAuth, merge_auth};
use crate::config::DispatchConfig;
use crate::dispatch::{DispatchHooks, DispatchReport, Dispatcher};
use crate::error::Result;
use crate::plan::SweepPlan;
use crate::request::{
    FilePathGenerator, RequestDescriptor, RequestFactory, ResponseHook, StopPredicate,
    StoragePredicate,
};
use crate::storage::Storage;
use crate::transport::{ReqwestTransport, Transport};
use crate::types::Event;

/// One request family ready to run
///
/// # Example
///
/// ```no_run
/// use reqsweep::{DispatchConfig, RequestFactory, Sweep};
/// use reqsweep::expand::FieldSpec;
/// use reqsweep::request::ResponseRecord;
/// use reqsweep::types::AxisValue;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let factory = RequestFactory::new("https://api.example.com/items").param(
///         FieldSpec::builder("param")
///             .varying("page", AxisValue::list(1..=50))
///             .build()?,
///     );
///
///     let sweep = Sweep::with_reqwest(factory, DispatchConfig::default())?
///         .stop_when(|r: &ResponseRecord| r.status == 404);
///
///     let report = sweep.execute().await?;
///     println!("{} pages fetched", report.completed);
///     Ok(())
/// }
/// ```
pub struct Sweep {
    factory: RequestFactory,
    provider: Arc<dyn AuthProvider>,
    hooks: DispatchHooks,
    dispatcher: Dispatcher,
}

impl Sweep {
    /// Sweep over a custom transport
    pub fn new(factory: RequestFactory, config: DispatchConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            factory,
            provider: Arc::new(NoAuth),
            hooks: DispatchHooks::default(),
            dispatcher: Dispatcher::new(config, transport),
        }
    }

    /// Sweep over a [`ReqwestTransport`] using the configured request timeout
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn with_reqwest(factory: RequestFactory, config: DispatchConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.request_timeout)?;
        Ok(Self::new(factory, config, Arc::new(transport)))
    }

    /// Sweep described by a loaded plan
    pub fn from_plan(plan: &SweepPlan, transport: Arc<dyn Transport>) -> Self {
        Self::new(plan.factory(), plan.config.clone(), transport)
    }

    /// Merge this provider's headers, params and credentials into every request
    pub fn auth_provider(mut self, provider: impl AuthProvider + 'static) -> Self {
        self.provider = Arc::new(provider);
        self
    }

    /// Stop scheduling once a response matches
    pub fn stop_when(mut self, predicate: impl StopPredicate + 'static) -> Self {
        self.hooks = self.hooks.stop_when(predicate);
        self
    }

    /// Only store completed requests that match
    pub fn store_when(mut self, predicate: impl StoragePredicate + 'static) -> Self {
        self.hooks = self.hooks.store_when(predicate);
        self
    }

    /// Transform each accepted response
    pub fn hook(mut self, hook: impl ResponseHook + 'static) -> Self {
        self.factory = self.factory.hook(hook);
        self
    }

    /// Where response bodies are written
    pub fn file_path(mut self, generator: impl FilePathGenerator + 'static) -> Self {
        self.factory = self.factory.file_path(generator);
        self
    }

    /// Storage backend for response bodies
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.factory = self.factory.storage(storage);
        self
    }

    /// Receive dispatch events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.dispatcher.subscribe()
    }

    /// Cancel the running (and any later) execution
    pub fn cancel(&self) {
        self.dispatcher.cancel();
    }

    /// Build every descriptor with the auth provider merged in
    ///
    /// # Errors
    /// Returns [`Error::Spec`](crate::Error::Spec) if the request family is invalid
    pub fn descriptors(&self) -> Result<Vec<RequestDescriptor>> {
        let mut descriptors = self.factory.build()?;
        for descriptor in &mut descriptors {
            merge_auth(self.provider.as_ref(), descriptor.parts_mut());
        }
        Ok(descriptors)
    }

    /// Build, dispatch and (if configured) wait for storage
    ///
    /// # Errors
    /// Specification errors surface before any request is sent; see
    /// [`Dispatcher::dispatch`] for the rest.
    pub async fn execute(&self) -> Result<DispatchReport> {
        let descriptors = self.descriptors()?;
        self.dispatcher
            .dispatch(descriptors, self.hooks.clone())
            .await
    }

    /// Like [`execute`](Self::execute), but a termination signal cancels the
    /// sweep and the partial report is returned
    pub async fn execute_until_signal(&self) -> Result<DispatchReport> {
        let execution = self.execute();
        tokio::pin!(execution);

        tokio::select! {
            report = &mut execution => report,
            _ = crate::wait_for_signal() => {
                tracing::info!("Cancelling sweep after signal");
                self.cancel();
                execution.await
            }
        }
    }
}

impl std::fmt::Debug for Sweep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sweep")
            .field("factory", &self.factory)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}
