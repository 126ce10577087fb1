//! Gateway facade wiring the pipeline, client directory, and pools together.

// crates.io
use tokio::task::JoinHandle;
// self
use crate::{
	_prelude::*,
	auth::CredentialId,
	client::{ClientDirectory, CredentialClient},
	config::GatewayConfig,
	ext::{ExhaustionPolicy, QuotaPolicy},
	pipeline::Pipeline,
	pool::{BoundedPool, PublicPool},
	store::CredentialStore,
	transport::GatewayHttpClient,
};
#[cfg(feature = "reqwest")] use crate::transport::ReqwestHttpClient;

/// Multi-tenant entry point to the upstream API.
///
/// The gateway owns one shared [`Pipeline`] and one [`ClientDirectory`]. Pools built from it
/// share the directory, so a credential active in several pools runs through one concurrency
/// gate and one rate-limit tracker.
#[derive(Clone, Debug)]
pub struct Gateway {
	pipeline: Arc<Pipeline>,
	directory: Arc<ClientDirectory>,
}
impl Gateway {
	/// Creates a gateway over a caller-provided transport with the default quota policy.
	pub fn with_http_client(
		http: Arc<dyn GatewayHttpClient>,
		store: Arc<dyn CredentialStore>,
		config: GatewayConfig,
	) -> Result<Self> {
		Self::with_quota_policy(http, store, config, Arc::new(ExhaustionPolicy::default()))
	}

	/// Creates a gateway with a custom [`QuotaPolicy`].
	pub fn with_quota_policy(
		http: Arc<dyn GatewayHttpClient>,
		store: Arc<dyn CredentialStore>,
		config: GatewayConfig,
		policy: Arc<dyn QuotaPolicy>,
	) -> Result<Self> {
		let pipeline = Arc::new(Pipeline::new(http, config)?);
		let directory = Arc::new(ClientDirectory::new(pipeline.clone(), store, policy));

		Ok(Self { pipeline, directory })
	}

	/// Validated configuration.
	pub fn config(&self) -> &GatewayConfig {
		self.pipeline.config()
	}

	/// Shared pipeline.
	pub fn pipeline(&self) -> &Arc<Pipeline> {
		&self.pipeline
	}

	/// Registry of active clients.
	pub fn directory(&self) -> &Arc<ClientDirectory> {
		&self.directory
	}

	/// Returns the client for `id`, activating it when needed.
	pub async fn client(&self, id: &CredentialId) -> Result<Arc<CredentialClient>> {
		self.directory.activate(id).await
	}

	/// Pool restricted to `ids`.
	pub fn bounded_pool<I>(&self, ids: I) -> BoundedPool
	where
		I: IntoIterator<Item = CredentialId>,
	{
		BoundedPool::new(self.directory.clone(), ids)
	}

	/// Pool over every live credential in the store.
	pub fn public_pool(&self) -> PublicPool {
		PublicPool::new(self.directory.clone(), self.config().public_reload_every)
	}

	/// Permanently revokes the credential `id` in the store and retires its client.
	///
	/// Returns `false` when the store held no live credential for `id`. Pools that still list
	/// the identity evict it on the next failed activation.
	pub async fn revoke(&self, id: &CredentialId) -> Result<bool> {
		let Some(credential) = self.directory.store().load_credential(id).await? else {
			return Ok(false);
		};
		let revoked = self
			.directory
			.store()
			.revoke_token(&credential.token, OffsetDateTime::now_utc())
			.await?;

		self.directory.retire_one(id).await;

		Ok(revoked)
	}

	/// Spawns the background task retiring idle clients.
	///
	/// The sweep runs at half the idle timeout, so a client lingers at most 1.5 times the
	/// timeout. The task ends once every gateway handle is dropped.
	pub fn spawn_idle_sweeper(&self) -> JoinHandle<()> {
		self.directory.spawn_idle_sweeper(self.config().client_idle_timeout / 2)
	}

	/// Retires every active client, persisting rate-limit snapshots.
	pub async fn shutdown(&self) -> usize {
		self.directory.deactivate_all().await
	}
}
#[cfg(feature = "reqwest")]
impl Gateway {
	/// Creates a gateway with its own reqwest transport and the default quota policy.
	pub fn new(store: Arc<dyn CredentialStore>, config: GatewayConfig) -> Result<Self> {
		let http = ReqwestHttpClient::new()?;

		Self::with_http_client(Arc::new(http), store, config)
	}
}
