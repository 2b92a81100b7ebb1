use msgboard_program::{codec::Record, Address};

use crate::{
    config::BoardConfig,
    error::BoardError,
    ledger::Ledger,
};

/// Board operations over one ledger and one program id.
pub struct BoardClient<L> {
    pub(crate) ledger: L,
    pub(crate) config: BoardConfig,
}

impl<L: Ledger> BoardClient<L> {
    pub fn new(ledger: L, config: BoardConfig) -> Result<Self, BoardError> {
        config.validate()?;
        Ok(Self { ledger, config })
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// Raw bytes at `address`, if any.
    pub(crate) async fn fetch(&self, address: &Address) -> Result<Option<Vec<u8>>, BoardError> {
        self.ledger
            .get_record(address)
            .await
            .map_err(|e| BoardError::from_ledger(*address, e))
    }

    /// Fetches and decodes the record at `address`; absence is MissingRecord.
    pub(crate) async fn fetch_record<R: Record>(&self, address: &Address) -> Result<R, BoardError> {
        fetch_record(&self.ledger, address).await
    }
}

pub(crate) async fn fetch_record<L: Ledger, R: Record>(
    ledger: &L,
    address: &Address,
) -> Result<R, BoardError> {
    let data = ledger
        .get_record(address)
        .await
        .map_err(|e| BoardError::from_ledger(*address, e))?
        .ok_or(BoardError::MissingRecord { address: *address })?;
    R::decode(&data).map_err(|source| BoardError::Decode { address: *address, source })
}
