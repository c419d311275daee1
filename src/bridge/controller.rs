//! Host controller: listener lifecycle and dispatch.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::bridge::coordinator::{failure, SigningCoordinator};
use crate::bridge::error::SignError;
use crate::bridge::origin::OriginPolicy;
use crate::bridge::signer::WalletSigner;
use crate::bridge::window::{InboundMessage, ListenerId, MessageChannel, WindowRef};
use crate::observability::metrics;
use crate::protocol::{classify, Inbound, Outbound, SignRequest, SwapResult, TimeoutNotice};

pub type TimeoutHandler = Arc<dyn Fn(&TimeoutNotice) + Send + Sync>;
pub type SwapSuccessHandler = Arc<dyn Fn(&SwapResult) + Send + Sync>;

/// Handlers a registration dispatches to.
#[derive(Clone, Default)]
pub struct WidgetHandlers {
    signing: Option<Arc<SigningCoordinator>>,
    on_timeout: Option<TimeoutHandler>,
    on_swap_success: Option<SwapSuccessHandler>,
}

impl WidgetHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer sign requests with `signer`.
    pub fn with_signer(self, signer: Arc<dyn WalletSigner>) -> Self {
        self.with_coordinator(Arc::new(SigningCoordinator::new(signer)))
    }

    /// Answer sign requests through an existing coordinator, e.g. to
    /// inspect its in-flight flows.
    pub fn with_coordinator(mut self, coordinator: Arc<SigningCoordinator>) -> Self {
        self.signing = Some(coordinator);
        self
    }

    pub fn on_sign_request_timeout<F>(mut self, handler: F) -> Self
    where
        F: Fn(&TimeoutNotice) + Send + Sync + 'static,
    {
        self.on_timeout = Some(Arc::new(handler));
        self
    }

    pub fn on_swap_success<F>(mut self, handler: F) -> Self
    where
        F: Fn(&SwapResult) + Send + Sync + 'static,
    {
        self.on_swap_success = Some(Arc::new(handler));
        self
    }

    pub fn coordinator(&self) -> Option<&Arc<SigningCoordinator>> {
        self.signing.as_ref()
    }
}

impl std::fmt::Debug for WidgetHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetHandlers")
            .field("signing", &self.signing)
            .field("on_timeout", &self.on_timeout.is_some())
            .field("on_swap_success", &self.on_swap_success.is_some())
            .finish()
    }
}

/// Where a reply goes: the requesting window and the target origin to post with.
#[derive(Clone)]
pub struct ReplyTarget {
    pub window: WindowRef,
    pub target_origin: String,
}

impl ReplyTarget {
    pub fn new(window: WindowRef, target_origin: impl Into<String>) -> Self {
        Self {
            window,
            target_origin: target_origin.into(),
        }
    }
}

impl std::fmt::Debug for ReplyTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyTarget")
            .field("target_origin", &self.target_origin)
            .finish_non_exhaustive()
    }
}

struct Binding {
    listener: ListenerId,
    generation: u64,
}

struct ControllerInner {
    channel: Arc<dyn MessageChannel>,
    policy: OriginPolicy,
    binding: Mutex<Option<Binding>>,
    generation: AtomicU64,
}

/// Owns at most one listener on a host window and answers widget messages.
pub struct WidgetController {
    inner: Arc<ControllerInner>,
}

impl WidgetController {
    /// A controller accepting only the hosted widget's origin.
    pub fn new(channel: Arc<dyn MessageChannel>) -> Self {
        Self::with_policy(channel, OriginPolicy::default())
    }

    pub fn with_policy(channel: Arc<dyn MessageChannel>, policy: OriginPolicy) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                channel,
                policy,
                binding: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn policy(&self) -> &OriginPolicy {
        &self.inner.policy
    }

    /// Bind a listener dispatching to `handlers`, replacing any current
    /// binding. The binding lasts until `unregister`, until the returned
    /// guard is dropped, or until the controller is dropped.
    pub fn register(&self, handlers: WidgetHandlers) -> Registration {
        let mut binding = self.inner.lock_binding();
        if let Some(previous) = binding.take() {
            self.inner.channel.remove_listener(previous.listener);
            tracing::debug!(generation = previous.generation, "Replaced widget listener");
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let weak = Arc::downgrade(&self.inner);
        let handlers = Arc::new(handlers);
        let listener = self.inner.channel.add_listener(Arc::new(move |message: &InboundMessage| {
            if let Some(inner) = weak.upgrade() {
                inner.dispatch(message, &handlers);
            }
        }));
        *binding = Some(Binding {
            listener,
            generation,
        });
        tracing::info!(generation, "Widget listener registered");

        Registration {
            inner: Arc::downgrade(&self.inner),
            generation,
            armed: true,
        }
    }

    /// Remove the current binding. Returns whether one existed.
    pub fn unregister(&self) -> bool {
        self.inner.unbind()
    }

    pub fn is_registered(&self) -> bool {
        self.inner.lock_binding().is_some()
    }

    /// Post `envelope` to `target`. No-op when there is no target.
    pub fn send(&self, envelope: &Outbound, target: Option<&ReplyTarget>) {
        post_reply(envelope, target);
    }
}

impl std::fmt::Debug for WidgetController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetController")
            .field("policy", &self.inner.policy)
            .field("registered", &self.is_registered())
            .finish()
    }
}

impl ControllerInner {
    fn lock_binding(&self) -> MutexGuard<'_, Option<Binding>> {
        self.binding.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn unbind(&self) -> bool {
        match self.lock_binding().take() {
            Some(binding) => {
                self.channel.remove_listener(binding.listener);
                tracing::info!(generation = binding.generation, "Widget listener unregistered");
                true
            }
            None => false,
        }
    }

    /// Unbind only if `generation` is still the current binding.
    fn release(&self, generation: u64) {
        let mut binding = self.lock_binding();
        if binding.as_ref().is_some_and(|b| b.generation == generation) {
            if let Some(b) = binding.take() {
                self.channel.remove_listener(b.listener);
                tracing::info!(generation, "Widget listener released");
            }
        }
    }

    fn dispatch(&self, message: &InboundMessage, handlers: &WidgetHandlers) {
        let Some(inbound) = classify(&message.data) else {
            tracing::trace!(origin = %message.origin, "Ignoring non-envelope message");
            return;
        };
        let kind = inbound.kind();

        if !self.policy.allows(&message.origin) {
            metrics::record_origin_rejected();
            tracing::warn!(
                origin = %message.origin,
                message_type = kind,
                "Dropping message from disallowed origin"
            );
            return;
        }
        metrics::record_inbound(kind);

        let reply_to = message.source.clone().map(|window| {
            ReplyTarget::new(window, self.policy.target_origin_for(&message.origin))
        });

        match inbound {
            Inbound::SignRequest(request) => start_signing(request, reply_to, handlers),
            Inbound::MalformedSignRequest { request_id, reason } => {
                tracing::warn!(origin = %message.origin, reason = %reason, "Malformed sign request");
                post_reply(
                    &failure(request_id, &SignError::MalformedRequest(reason)),
                    reply_to.as_ref(),
                );
            }
            Inbound::SignRequestTimeout(notice) => {
                if let Some(coordinator) = &handlers.signing {
                    coordinator.record_timeout(&notice);
                }
                if let Some(handler) = &handlers.on_timeout {
                    guarded(kind, || handler(&notice));
                }
            }
            Inbound::SwapSuccess(result) => {
                tracing::info!(origin = %message.origin, "Swap completed in widget");
                if let Some(handler) = &handlers.on_swap_success {
                    guarded(kind, || handler(&result));
                }
            }
            Inbound::Unrouted(tag) => {
                tracing::debug!(message_type = %tag, "Ignoring host-bound message type");
            }
            Inbound::Unknown(tag) => {
                tracing::debug!(message_type = %tag, "Ignoring unknown message type");
            }
        }
    }
}

impl Drop for ControllerInner {
    fn drop(&mut self) {
        let binding = self.binding.get_mut().unwrap_or_else(|p| p.into_inner());
        if let Some(b) = binding.take() {
            self.channel.remove_listener(b.listener);
            tracing::debug!(generation = b.generation, "Widget listener dropped with controller");
        }
    }
}

/// Scoped listener binding returned by `WidgetController::register`.
///
/// Dropping it unbinds the listener unless a newer registration replaced it.
#[must_use = "dropping the registration unbinds the listener"]
pub struct Registration {
    inner: Weak<ControllerInner>,
    generation: u64,
    armed: bool,
}

impl Registration {
    /// Unbind now.
    pub fn disconnect(self) {
        drop(self);
    }

    /// Keep the binding until `unregister` or controller drop.
    pub fn detach(mut self) {
        self.armed = false;
    }

    /// Whether this registration is still the controller's current binding.
    pub fn is_active(&self) -> bool {
        self.inner.upgrade().is_some_and(|inner| {
            inner
                .lock_binding()
                .as_ref()
                .is_some_and(|b| b.generation == self.generation)
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(inner) = self.inner.upgrade() {
            inner.release(self.generation);
        }
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("generation", &self.generation)
            .field("armed", &self.armed)
            .finish()
    }
}

fn start_signing(request: SignRequest, reply_to: Option<ReplyTarget>, handlers: &WidgetHandlers) {
    let Some(coordinator) = handlers.signing.clone() else {
        tracing::warn!("Sign request received but no signer is configured");
        post_reply(&failure(request.request_id, &SignError::NotConnected), reply_to.as_ref());
        return;
    };

    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn(async move {
                let outbound = coordinator.handle(request).await;
                post_reply(&outbound, reply_to.as_ref());
            });
        }
        Err(_) => {
            tracing::error!("No async runtime available to run the signer");
            let err = SignError::SignerRejected("no async runtime available".into());
            post_reply(&failure(request.request_id, &err), reply_to.as_ref());
        }
    }
}

fn post_reply(envelope: &Outbound, target: Option<&ReplyTarget>) {
    let message_type = envelope.message_type();
    let Some(target) = target else {
        tracing::debug!(message_type = %message_type, "No reply target; dropping envelope");
        return;
    };
    target
        .window
        .post_message(envelope.to_wire(), &target.target_origin);
    metrics::record_outbound(message_type.as_str());
    tracing::debug!(
        message_type = %message_type,
        request_id = envelope.request_id().map(tracing::field::display),
        target_origin = %target.target_origin,
        "Posted reply to widget"
    );
}

/// Run a user callback, logging instead of unwinding into the channel.
fn guarded(kind: &str, f: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        tracing::error!(message_type = kind, "Widget message handler panicked");
    }
}
