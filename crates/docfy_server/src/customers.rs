//! Customer records.
//!
//! An active customer owns its `number`: no other active customer may use
//! it. Inactive customers are never checked.

use crate::error::{ServerError, ServerResult};
use crate::handler::{BackOfficeStore, Reply, RequestHandler};
use docfy_model::{Customer, CustomerSummary, LocalId};
use docfy_sync_engine::{AccountAuthorizer, ContactsClient};
use tracing::debug;

fn parse_id(id: &str) -> ServerResult<LocalId> {
    id.parse()
        .map_err(|_| ServerError::InvalidRequest(format!("Invalid customer id {id}")))
}

impl<C, A, S> RequestHandler<C, A, S>
where
    C: ContactsClient + 'static,
    A: AccountAuthorizer,
    S: BackOfficeStore,
{
    /// Creates a customer and assigns its id.
    pub async fn create_customer(
        &self,
        authorization: Option<&str>,
        mut customer: Customer,
    ) -> ServerResult<Reply<Customer>> {
        self.authorize(authorization)?;
        customer.id = None;
        self.check_active_number(&customer).await?;

        let customer = self.context.store.insert_customer(customer).await?;
        debug!(
            number = ?customer.number,
            name = ?customer.name,
            "new customer created"
        );
        Ok(Reply::created(customer))
    }

    /// Lists active customers by number.
    pub async fn find_all_active_customers(
        &self,
        authorization: Option<&str>,
    ) -> ServerResult<Reply<Vec<CustomerSummary>>> {
        self.authorize(authorization)?;
        let customers = self.context.store.find_active_customers().await?;
        debug!(count = customers.len(), "active customers found");
        Ok(Reply::ok(customers.iter().map(Customer::summary).collect()))
    }

    /// Looks up a customer. Answers 204 with no body when it does not exist.
    pub async fn find_customer_by_id(
        &self,
        authorization: Option<&str>,
        id: &str,
    ) -> ServerResult<Reply<Option<Customer>>> {
        self.authorize(authorization)?;
        let customer = self.context.store.find_customer(parse_id(id)?).await?;
        debug!(%id, found = customer.is_some(), "customer lookup");
        Ok(Reply::found(customer))
    }

    /// Replaces a customer's fields, keeping its id.
    pub async fn update_customer(
        &self,
        authorization: Option<&str>,
        id: &str,
        mut customer: Customer,
    ) -> ServerResult<Reply<Customer>> {
        self.authorize(authorization)?;
        let id = parse_id(id)?;
        customer.id = Some(id);
        self.check_active_number(&customer).await?;

        let customer = self.context.store.replace_customer(id, customer).await?;
        debug!(%id, "customer updated");
        Ok(Reply::ok(customer))
    }

    async fn check_active_number(&self, customer: &Customer) -> ServerResult<()> {
        let Some(number) = customer.number else {
            return Ok(());
        };
        if !customer.is_active() {
            return Ok(());
        }
        match self.context.store.find_active_by_number(number).await? {
            Some(existing) if customer.number_clashes_with(&existing) => Err(
                ServerError::InvalidRequest(format!(
                    "Customer number {number} in use for active customer"
                )),
            ),
            _ => Ok(()),
        }
    }
}
