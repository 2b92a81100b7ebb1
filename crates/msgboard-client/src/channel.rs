//! Channel construction.
//!
//! ensure_channel: derive from the name, create only if absent. A creation
//! race lost to another caller is success: the existing record wins.

use msgboard_program::{
    address::channel_address,
    instruction::create_channel_instruction,
    state::channel_name_is_valid,
    Address, ChannelRecord, RejectReason,
};
use tracing::{debug, info, warn};

use crate::{
    client::BoardClient,
    error::BoardError,
    ledger::{Credential, Ledger, LedgerError},
};

impl<L: Ledger> BoardClient<L> {
    /// Returns the address of channel `name`, creating it (paid by `payer`) if needed.
    pub async fn ensure_channel<C: Credential + ?Sized>(
        &self,
        name: &str,
        payer: &C,
    ) -> Result<Address, BoardError> {
        if !channel_name_is_valid(name) {
            return Err(BoardError::InvalidName { name: name.to_owned() });
        }
        let program_id = &self.config.program_id;
        let address = channel_address(program_id, name)?;
        if self.fetch(&address).await?.is_some() {
            debug!(%address, name, "channel exists");
            return Ok(address);
        }

        let payer = payer.address();
        let ix = create_channel_instruction(program_id, name, &payer)?;
        match self.ledger.submit_transaction(&[ix], &[payer]).await {
            Ok(()) => {
                info!(%address, name, "channel created");
                Ok(address)
            }
            Err(LedgerError::Rejected(r)) if r.is(RejectReason::AccountAlreadyInitialized) => {
                warn!(%address, name, "channel created concurrently, using existing record");
                Ok(address)
            }
            Err(e) => Err(BoardError::from_ledger(address, e)),
        }
    }

    /// Reads and decodes the channel record at `address`.
    pub async fn read_channel(&self, address: &Address) -> Result<ChannelRecord, BoardError> {
        self.fetch_record(address).await
    }
}
