//! Gateway gRPC client.
//!
//! Opens the gateway's server-streaming subscription calls over one shared
//! `tonic` channel. Each call to [`GatewayTransport::open_stream`] is an
//! independent HTTP/2 stream; dropping its source resets the stream.

use async_trait::async_trait;
use futures::StreamExt;
use tonic::client::Grpc;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::metadata::AsciiMetadataValue;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tonic::{Code, Request, Status};

use super::config::GatewayConfig;
use super::error::GatewayError;
use super::proto::{
    self, OnPositionProfitRequest, OnPositionProfitReply, OnPositionsAndPendingOrdersTicketsReply,
    OnPositionsAndPendingOrdersTicketsRequest, OnSymbolTickReply, OnSymbolTickRequest,
    OnTradeReply, OnTradeRequest, OnTradeTransactionReply, OnTradeTransactionRequest, WireMessage,
};
use crate::application::ports::{GatewayTransport, RawMessageSource, TransportError};
use crate::application::services::CancellationScope;
use crate::domain::subscription::{FeedKind, SubscriptionDescriptor};

/// Metadata key carrying the terminal session id.
const SESSION_METADATA_KEY: &str = "id";

/// Client for the gateway's subscription service.
///
/// Cheap to clone; clones share the underlying channel.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    channel: Channel,
    session_id: Option<AsciiMetadataValue>,
    config: GatewayConfig,
}

impl GatewayClient {
    /// Connect to the gateway.
    ///
    /// # Errors
    ///
    /// Returns error if connection fails or configuration is invalid.
    pub async fn connect(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let session_id = Self::session_metadata(config)?;
        let endpoint = Self::create_endpoint(config)?;
        let channel = endpoint.connect().await?;

        tracing::info!(endpoint = %config.endpoint, "Connected to gateway");

        Ok(Self {
            channel,
            session_id,
            config: config.clone(),
        })
    }

    /// Connect lazily (connection established on first request).
    ///
    /// # Errors
    ///
    /// Returns error if endpoint configuration is invalid.
    pub fn connect_lazy(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let session_id = Self::session_metadata(config)?;
        let endpoint = Self::create_endpoint(config)?;
        let channel = endpoint.connect_lazy();

        tracing::debug!(endpoint = %config.endpoint, "Created lazy connection to gateway");

        Ok(Self {
            channel,
            session_id,
            config: config.clone(),
        })
    }

    /// Configuration the client was built from.
    #[must_use]
    pub const fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Create a configured endpoint from the config.
    fn create_endpoint(config: &GatewayConfig) -> Result<Endpoint, GatewayError> {
        let mut endpoint = Channel::from_shared(config.endpoint.clone())
            .map_err(|e| GatewayError::InvalidConfig {
                message: format!("invalid endpoint: {e}"),
            })?
            .connect_timeout(config.connect_timeout)
            .tcp_keepalive(Some(config.tcp_keepalive))
            .http2_keep_alive_interval(config.http2_keepalive_interval)
            .keep_alive_timeout(config.keepalive_timeout)
            .keep_alive_while_idle(true)
            .tcp_nodelay(true);

        if config.use_tls {
            endpoint = endpoint.tls_config(ClientTlsConfig::new().with_native_roots())?;
        }

        Ok(endpoint)
    }

    fn session_metadata(config: &GatewayConfig) -> Result<Option<AsciiMetadataValue>, GatewayError> {
        config
            .session_id
            .as_deref()
            .map(|id| {
                AsciiMetadataValue::try_from(id).map_err(|e| GatewayError::InvalidConfig {
                    message: format!("invalid session id: {e}"),
                })
            })
            .transpose()
    }

    /// Build a request carrying the session id and the scope's deadline.
    fn request<T>(&self, message: T, scope: &CancellationScope) -> Request<T> {
        let mut request = Request::new(message);

        if let Some(session_id) = &self.session_id {
            request
                .metadata_mut()
                .insert(SESSION_METADATA_KEY, session_id.clone());
        }
        if let Some(deadline) = scope.deadline() {
            request.set_timeout(deadline.saturating_duration_since(tokio::time::Instant::now()));
        }

        request
    }

    /// Open one server-streaming call and adapt its replies to wire messages.
    async fn open<Req, Reply>(
        &self,
        path: &'static str,
        request: Request<Req>,
    ) -> Result<RawMessageSource, TransportError>
    where
        Req: prost::Message + Send + Sync + 'static,
        Reply: prost::Message + Default + Send + Sync + 'static,
        WireMessage: From<Reply>,
    {
        let mut grpc = Grpc::new(self.channel.clone());
        grpc.ready()
            .await
            .map_err(|e| TransportError::Unavailable {
                message: format!("channel not ready: {e}"),
            })?;

        let codec = tonic_prost::ProstCodec::<Req, Reply>::default();
        let response = grpc
            .server_streaming(request, PathAndQuery::from_static(path), codec)
            .await
            .map_err(|status| map_status(&status))?;

        let stream = response
            .into_inner()
            .map(|item| item.map(WireMessage::from).map_err(|status| map_status(&status)));

        Ok(RawMessageSource::new(stream))
    }
}

#[async_trait]
impl GatewayTransport for GatewayClient {
    async fn open_stream(
        &self,
        descriptor: &SubscriptionDescriptor,
        scope: &CancellationScope,
    ) -> Result<RawMessageSource, TransportError> {
        let params = descriptor.params();
        let timer_period_milliseconds =
            i32::try_from(params.interval.as_millis()).unwrap_or(i32::MAX);

        tracing::debug!(
            feed = %descriptor.kind(),
            endpoint = %self.config.endpoint,
            "Opening gateway stream"
        );

        match descriptor.kind() {
            FeedKind::Tick => {
                let request = OnSymbolTickRequest {
                    symbol_names: params.symbols.clone(),
                };
                self.open::<_, OnSymbolTickReply>(
                    proto::ON_SYMBOL_TICK,
                    self.request(request, scope),
                )
                .await
            }
            FeedKind::PositionProfit => {
                let request = OnPositionProfitRequest {
                    timer_period_milliseconds,
                    ignore_empty_data: params.ignore_empty,
                };
                self.open::<_, OnPositionProfitReply>(
                    proto::ON_POSITION_PROFIT,
                    self.request(request, scope),
                )
                .await
            }
            FeedKind::OpenedTicketSet => {
                let request = OnPositionsAndPendingOrdersTicketsRequest {
                    timer_period_milliseconds,
                };
                self.open::<_, OnPositionsAndPendingOrdersTicketsReply>(
                    proto::ON_POSITIONS_AND_PENDING_ORDERS_TICKETS,
                    self.request(request, scope),
                )
                .await
            }
            FeedKind::TradeEvent => {
                self.open::<_, OnTradeReply>(
                    proto::ON_TRADE,
                    self.request(OnTradeRequest {}, scope),
                )
                .await
            }
            FeedKind::Transaction => {
                self.open::<_, OnTradeTransactionReply>(
                    proto::ON_TRADE_TRANSACTION,
                    self.request(OnTradeTransactionRequest {}, scope),
                )
                .await
            }
        }
    }
}

/// Map a gRPC status to a transport error.
#[must_use]
pub fn map_status(status: &Status) -> TransportError {
    let message = status.message().to_string();
    match status.code() {
        Code::Unavailable => TransportError::Unavailable { message },
        Code::DeadlineExceeded => TransportError::DeadlineExceeded { message },
        Code::Aborted => TransportError::Aborted { message },
        Code::Cancelled => TransportError::ServerCancelled { message },
        Code::Internal | Code::DataLoss | Code::Unimplemented => {
            TransportError::Protocol { message }
        }
        _ => TransportError::Other { message },
    }
}
