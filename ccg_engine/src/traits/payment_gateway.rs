use crate::traits::{ChargeHandle, ChargeRequest, ChargeSummary, GatewayError, RemoteCharge};

/// An external payment provider. Implementations must bound every call with a timeout and report it as
/// [`GatewayError::Transient`] when it expires.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    /// False when the provider has no credentials. Callers use this to report the feature as disabled without making a
    /// network call.
    fn is_configured(&self) -> bool;

    /// Creates a charge for the given amount. The provider is not asked to deduplicate, so callers must ensure that
    /// only one charge is requested per claim.
    async fn create_charge(&self, request: ChargeRequest) -> Result<ChargeHandle, GatewayError>;

    /// Reads the current status of a charge. No side effects.
    async fn query_charge(&self, charge_id: &str) -> Result<RemoteCharge, GatewayError>;

    /// Lists the charges on the provider account. No side effects.
    async fn list_charges(&self) -> Result<Vec<ChargeSummary>, GatewayError>;
}
