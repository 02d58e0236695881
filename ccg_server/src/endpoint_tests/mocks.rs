use ccg_engine::traits::{ChargeHandle, ChargeRequest, ChargeSummary, GatewayError, PaymentGateway, RemoteCharge};
use mockall::mock;

mock! {
    pub Gateway {}
    impl PaymentGateway for Gateway {
        fn is_configured(&self) -> bool;
        async fn create_charge(&self, request: ChargeRequest) -> Result<ChargeHandle, GatewayError>;
        async fn query_charge(&self, charge_id: &str) -> Result<RemoteCharge, GatewayError>;
        async fn list_charges(&self) -> Result<Vec<ChargeSummary>, GatewayError>;
    }
}
