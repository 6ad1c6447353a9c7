use async_trait::async_trait;

use crate::clients::{AsaasClient, CheckoutItem, MercadoPagoClient, ProviderError};
use crate::models::{PaymentProvider, ProviderResource, ResourceKind};

/// Payment provider APIs as seen by billing.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn fetch_resource(
        &self,
        provider: PaymentProvider,
        kind: ResourceKind,
        id: &str,
    ) -> Result<ProviderResource, ProviderError>;

    /// Hosted checkout link for `item`.
    async fn create_checkout(&self, item: &CheckoutItem) -> Result<String, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    mercadopago: MercadoPagoClient,
    asaas: AsaasClient,
}

impl HttpPaymentGateway {
    pub fn new(mercadopago: MercadoPagoClient, asaas: AsaasClient) -> Self {
        Self { mercadopago, asaas }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn fetch_resource(
        &self,
        provider: PaymentProvider,
        kind: ResourceKind,
        id: &str,
    ) -> Result<ProviderResource, ProviderError> {
        match provider {
            PaymentProvider::MercadoPago => self.mercadopago.fetch_resource(kind, id).await,
            PaymentProvider::Asaas => self.asaas.fetch_resource(kind, id).await,
        }
    }

    async fn create_checkout(&self, item: &CheckoutItem) -> Result<String, ProviderError> {
        self.mercadopago.create_preference(item).await
    }
}
