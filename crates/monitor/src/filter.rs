use metrics::counter;
use tracing::warn;
use tron_deposit_domain::storage::AddressBook;
use tron_deposit_domain::TronAddress;

/// Answers whether a destination belongs to a tracked account.
///
/// Fails closed: a lookup error counts as "not monitored". A missed deposit
/// can be replayed by hand; crediting an address we could not verify cannot
/// be undone as easily.
pub struct AddressMonitor<B> {
    book: B,
}

impl<B> AddressMonitor<B>
where
    B: AddressBook,
{
    pub fn new(book: B) -> Self {
        Self { book }
    }

    pub async fn is_monitored(&self, address: &TronAddress) -> bool {
        match self.book.is_active_address(address).await {
            Ok(monitored) => monitored,
            Err(err) => {
                counter!("monitor_address_lookup_errors_total").increment(1);
                warn!(%address, error = %err, "address lookup failed; treating as unmonitored");
                false
            }
        }
    }
}
