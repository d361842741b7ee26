//! Transfer records with their derived zakat obligation.

use crate::core::account::AccountId;
use crate::types::amount::Amount;
use crate::types::encoding::Encode;
use crate::types::hash::Hash;
use ledger_derive::BinaryCodec;

/// Zakat rate in thousandths: 25‰ = 2.5%.
pub const ZAKAT_PER_MILLE: i128 = 25;

/// Identifier of a transaction, the digest of its canonical encoding.
pub type TransactionId = Hash;

/// Zakat owed on a transfer of `amount`.
///
/// Truncates to whole 10⁻⁸ units. Used both when a transaction is created and
/// when a committed one is re-verified, so the two always agree.
pub fn zakat_of(amount: Amount) -> Amount {
    amount.per_mille(ZAKAT_PER_MILLE)
}

/// One transfer between two accounts.
///
/// Field order is the encoding order, which feeds the block hash.
#[derive(Debug, Clone, PartialEq, Eq, BinaryCodec)]
pub struct Transaction {
    pub sender: AccountId,
    pub receiver: AccountId,
    /// Value credited to the receiver, before zakat.
    pub amount: Amount,
    /// Levy credited to `zakat_receiver`, always `zakat_of(amount)`.
    pub zakat_amount: Amount,
    pub zakat_receiver: AccountId,
    /// Creation time, nanoseconds since the Unix epoch.
    pub timestamp: u64,
}

impl Transaction {
    /// Builds a transfer and computes its zakat.
    ///
    /// Performs no balance or registration checks; see
    /// [`create_transfer`](crate::core::ledger::create_transfer) for the
    /// checked constructor.
    pub fn transfer(
        sender: AccountId,
        receiver: AccountId,
        amount: Amount,
        zakat_receiver: AccountId,
        timestamp: u64,
    ) -> Self {
        Self {
            sender,
            receiver,
            amount,
            zakat_amount: zakat_of(amount),
            zakat_receiver,
            timestamp,
        }
    }

    /// Total leaving the sender: the amount plus its zakat. `None` if the sum
    /// overflows.
    pub fn total_debit(&self) -> Option<Amount> {
        self.amount.checked_add(self.zakat_amount)
    }

    pub fn has_consistent_zakat(&self) -> bool {
        self.zakat_amount == zakat_of(self.amount)
    }

    pub fn id(&self) -> TransactionId {
        let mut h = Hash::sha3();
        h.update(b"TX");
        self.encode(&mut h);
        h.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::encoding::Decode;

    fn tx(amount: &str) -> Transaction {
        Transaction::transfer(
            AccountId::from("Alice"),
            AccountId::from("Bob"),
            amount.parse().unwrap(),
            AccountId::from("Zakat_Account"),
            1_000,
        )
    }

    #[test]
    fn zakat_of_fifty_is_exactly_one_point_two_five() {
        assert_eq!(zakat_of(Amount::from_coins(50)), "1.25".parse().unwrap());
        assert_eq!(tx("50").zakat_amount.to_string(), "1.25");
    }

    #[test]
    fn zakat_truncates_below_smallest_unit() {
        assert_eq!(zakat_of(Amount::from_units(39)), Amount::from_units(0));
        assert_eq!(zakat_of(Amount::from_units(40)), Amount::from_units(1));
    }

    #[test]
    fn total_debit_includes_zakat() {
        assert_eq!(tx("50").total_debit(), Some("51.25".parse().unwrap()));
    }

    #[test]
    fn consistency_detects_edited_amount() {
        let mut t = tx("50");
        assert!(t.has_consistent_zakat());
        t.amount = Amount::from_coins(500);
        assert!(!t.has_consistent_zakat());
    }

    #[test]
    fn id_depends_on_every_field() {
        let base = tx("50");
        let mut later = base.clone();
        later.timestamp += 1;
        let mut other_receiver = base.clone();
        other_receiver.receiver = AccountId::from("Carol");

        assert_eq!(base.id(), tx("50").id());
        assert_ne!(base.id(), later.id());
        assert_ne!(base.id(), other_receiver.id());
    }

    #[test]
    fn codec_preserves_transaction() {
        let t = tx("12.5");
        assert_eq!(Transaction::from_bytes(&t.to_vec()).unwrap(), t);
    }
}
