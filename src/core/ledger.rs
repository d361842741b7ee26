//! Balance derivation by replaying the chain.
//!
//! No balance is ever stored. An account's balance is its opening balance
//! plus the net effect of every committed transaction, in block then
//! transaction order, optionally followed by the pending buffer.

use crate::core::account::{AccountId, AccountRegistry};
use crate::core::blockchain::Blockchain;
use crate::core::errors::{LedgerError, Result};
use crate::core::transaction::Transaction;
use crate::types::amount::Amount;
use dashmap::DashMap;
use std::collections::BTreeMap;

/// Net change `tx` makes to `account`, or `None` if it overflows.
///
/// The sender pays amount plus zakat, the receiver gains the amount, and the
/// collection account gains the zakat. Roles add up when one account holds
/// several of them.
pub fn delta_for(account: &str, tx: &Transaction) -> Option<Amount> {
    let mut delta = Amount::ZERO;
    if tx.sender.as_str() == account {
        delta = delta.checked_sub(tx.total_debit()?)?;
    }
    if tx.receiver.as_str() == account {
        delta = delta.checked_add(tx.amount)?;
    }
    if tx.zakat_receiver.as_str() == account {
        delta = delta.checked_add(tx.zakat_amount)?;
    }
    Some(delta)
}

/// Applies every side of `tx` to a balance table.
pub fn apply(balances: &mut BTreeMap<AccountId, Amount>, tx: &Transaction) -> Result<()> {
    let debit = tx
        .total_debit()
        .ok_or_else(|| LedgerError::BalanceOverflow(tx.sender.clone()))?;
    adjust(balances, &tx.sender, |balance| balance.checked_sub(debit))?;
    adjust(balances, &tx.receiver, |balance| balance.checked_add(tx.amount))?;
    adjust(balances, &tx.zakat_receiver, |balance| {
        balance.checked_add(tx.zakat_amount)
    })
}

fn adjust(
    balances: &mut BTreeMap<AccountId, Amount>,
    account: &AccountId,
    change: impl FnOnce(Amount) -> Option<Amount>,
) -> Result<()> {
    let balance = balances.entry(account.clone()).or_default();
    *balance = change(*balance).ok_or_else(|| LedgerError::BalanceOverflow(account.clone()))?;
    Ok(())
}

/// Balances of every registered account, plus any account a transaction
/// names without it being registered.
pub fn replay(
    registry: &AccountRegistry,
    chain: &Blockchain,
    include_pending: bool,
) -> Result<BTreeMap<AccountId, Amount>> {
    let mut balances: BTreeMap<AccountId, Amount> = registry
        .iter()
        .map(|account| (account.id.clone(), account.initial_balance))
        .collect();

    for tx in chain.committed_transactions() {
        apply(&mut balances, tx)?;
    }
    if include_pending {
        for tx in chain.pending() {
            apply(&mut balances, tx)?;
        }
    }
    Ok(balances)
}

/// Balance of one account, folding committed and optionally pending
/// transactions over its opening balance.
pub fn balance_of(
    registry: &AccountRegistry,
    chain: &Blockchain,
    account: &str,
    include_pending: bool,
) -> Result<Amount> {
    let opening = registry.opening_balance(account)?;
    let committed = fold(opening, account, chain.committed_transactions())?;
    if include_pending {
        fold(committed, account, chain.pending())
    } else {
        Ok(committed)
    }
}

fn fold<'a>(
    start: Amount,
    account: &str,
    transactions: impl IntoIterator<Item = &'a Transaction>,
) -> Result<Amount> {
    transactions.into_iter().try_fold(start, |balance, tx| {
        delta_for(account, tx)
            .and_then(|delta| balance.checked_add(delta))
            .ok_or_else(|| LedgerError::BalanceOverflow(AccountId::from(account)))
    })
}

/// Builds a checked transfer from `sender` to `receiver`.
///
/// The sender must afford `amount` plus its zakat out of the balance that
/// already counts pending transactions. The timestamp is clamped so the
/// pending buffer stays in time order. Nothing is queued; the caller decides
/// whether to push the result.
pub fn create_transfer(
    registry: &AccountRegistry,
    chain: &Blockchain,
    sender: &str,
    receiver: &str,
    amount: Amount,
    zakat_account: &AccountId,
    now: u64,
) -> Result<Transaction> {
    if !amount.is_positive() {
        return Err(LedgerError::InvalidAmount { amount });
    }
    if amount.exceeds_max() {
        return Err(LedgerError::AmountTooLarge { amount });
    }
    if sender == receiver {
        return Err(LedgerError::SelfTransfer(AccountId::from(sender)));
    }
    for party in [sender, receiver] {
        if !registry.contains(party) {
            return Err(LedgerError::UnknownAccount(AccountId::from(party)));
        }
    }

    let tx = Transaction::transfer(
        AccountId::from(sender),
        AccountId::from(receiver),
        amount,
        zakat_account.clone(),
        chain.next_timestamp(now),
    );

    let available = balance_of(registry, chain, sender, true)?;
    let required = tx
        .total_debit()
        .ok_or(LedgerError::AmountTooLarge { amount })?;
    if available < required {
        return Err(LedgerError::InsufficientBalance {
            account: tx.sender,
            available,
            required,
        });
    }

    Ok(tx)
}

/// Memoized committed-only balances.
///
/// Each entry remembers the chain length it was computed at and is ignored
/// once the chain grows. Anything that alters existing blocks must call
/// [`clear`](BalanceCache::clear).
#[derive(Debug, Default)]
pub struct BalanceCache {
    entries: DashMap<AccountId, (usize, Amount)>,
}

impl BalanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed balance of `account`, served from the cache when it is
    /// current for `chain`.
    pub fn committed_balance(
        &self,
        registry: &AccountRegistry,
        chain: &Blockchain,
        account: &str,
    ) -> Result<Amount> {
        let height = chain.len();
        if let Some(entry) = self.entries.get(account)
            && entry.0 == height
        {
            return Ok(entry.1);
        }

        let balance = balance_of(registry, chain, account, false)?;
        self.entries
            .insert(AccountId::from(account), (height, balance));
        Ok(balance)
    }

    /// Committed balance plus the effect of the pending buffer.
    pub fn balance_including_pending(
        &self,
        registry: &AccountRegistry,
        chain: &Blockchain,
        account: &str,
    ) -> Result<Amount> {
        let committed = self.committed_balance(registry, chain, account)?;
        fold(committed, account, chain.pending())
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::account::Account;

    const ZAKAT: &str = "Zakat_Account";

    fn amt(s: &str) -> Amount {
        s.parse().unwrap()
    }

    fn registry() -> AccountRegistry {
        AccountRegistry::from_accounts(vec![
            Account::new("Alice", Amount::from_coins(200), "1001", 0).unwrap(),
            Account::new("Bob", Amount::from_coins(200), "1002", 0).unwrap(),
            Account::new(ZAKAT, Amount::ZERO, "0000", 0).unwrap(),
        ])
        .unwrap()
    }

    fn submit(
        registry: &AccountRegistry,
        chain: &mut Blockchain,
        from: &str,
        to: &str,
        amount: &str,
    ) -> Result<Transaction> {
        let tx = create_transfer(
            registry,
            chain,
            from,
            to,
            amt(amount),
            &AccountId::from(ZAKAT),
            1,
        )?;
        chain.push_pending(tx.clone());
        Ok(tx)
    }

    #[test]
    fn alice_pays_bob_fifty() {
        let registry = registry();
        let mut chain = Blockchain::new("0000", 0);
        submit(&registry, &mut chain, "Alice", "Bob", "50").unwrap();
        chain.mine("1001", 2).unwrap();

        assert_eq!(balance_of(&registry, &chain, "Alice", false).unwrap(), amt("148.75"));
        assert_eq!(balance_of(&registry, &chain, "Bob", false).unwrap(), amt("250"));
        assert_eq!(balance_of(&registry, &chain, ZAKAT, false).unwrap(), amt("1.25"));
    }

    #[test]
    fn untouched_account_keeps_opening_balance() {
        let registry = registry();
        let chain = Blockchain::new("0000", 0);
        assert_eq!(
            balance_of(&registry, &chain, "Bob", true).unwrap(),
            Amount::from_coins(200)
        );
    }

    #[test]
    fn pending_only_counts_when_asked() {
        let registry = registry();
        let mut chain = Blockchain::new("0000", 0);
        submit(&registry, &mut chain, "Alice", "Bob", "50").unwrap();

        assert_eq!(balance_of(&registry, &chain, "Alice", false).unwrap(), amt("200"));
        assert_eq!(balance_of(&registry, &chain, "Alice", true).unwrap(), amt("148.75"));
    }

    #[test]
    fn unknown_account_balance_fails() {
        let chain = Blockchain::new("0000", 0);
        assert_eq!(
            balance_of(&registry(), &chain, "Carol", false),
            Err(LedgerError::UnknownAccount(AccountId::from("Carol")))
        );
    }

    #[test]
    fn create_transfer_rejects_non_positive_amounts() {
        let registry = registry();
        let mut chain = Blockchain::new("0000", 0);
        assert_eq!(
            submit(&registry, &mut chain, "Alice", "Bob", "-10"),
            Err(LedgerError::InvalidAmount { amount: amt("-10") })
        );
        assert_eq!(
            submit(&registry, &mut chain, "Alice", "Bob", "0"),
            Err(LedgerError::InvalidAmount { amount: Amount::ZERO })
        );
        assert!(chain.pending().is_empty());
    }

    #[test]
    fn create_transfer_rejects_amounts_above_max() {
        let registry = registry();
        let chain = Blockchain::new("0000", 0);
        for amount in [
            Amount::from_units(Amount::MAX.units() + 1),
            Amount::from_units(i128::MAX),
        ] {
            assert_eq!(
                create_transfer(
                    &registry,
                    &chain,
                    "Alice",
                    "Bob",
                    amount,
                    &AccountId::from(ZAKAT),
                    1
                ),
                Err(LedgerError::AmountTooLarge { amount })
            );
        }
    }

    #[test]
    fn largest_transfer_is_checked_against_balance() {
        let registry = registry();
        let chain = Blockchain::new("0000", 0);
        let err = create_transfer(
            &registry,
            &chain,
            "Alice",
            "Bob",
            Amount::MAX,
            &AccountId::from(ZAKAT),
            1,
        )
        .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientBalance {
                account: AccountId::from("Alice"),
                available: amt("200"),
                required: Amount::from_units(Amount::MAX.units() / 1000 * 1025),
            }
        );
    }

    #[test]
    fn overflowing_balances_are_reported() {
        let registry = registry();
        let mut chain = Blockchain::new("0000", 0);
        submit(&registry, &mut chain, "Alice", "Bob", "50").unwrap();
        chain.mine("1001", 2).unwrap();
        chain.block_mut(1).unwrap().transactions[0].amount = Amount::from_units(i128::MAX);

        assert_eq!(
            replay(&registry, &chain, false),
            Err(LedgerError::BalanceOverflow(AccountId::from("Alice")))
        );
        assert_eq!(
            balance_of(&registry, &chain, "Alice", false),
            Err(LedgerError::BalanceOverflow(AccountId::from("Alice")))
        );
        assert_eq!(
            balance_of(&registry, &chain, "Bob", false),
            Err(LedgerError::BalanceOverflow(AccountId::from("Bob")))
        );
        assert_eq!(
            BalanceCache::new().balance_including_pending(&registry, &chain, "Bob"),
            Err(LedgerError::BalanceOverflow(AccountId::from("Bob")))
        );
    }

    #[test]
    fn create_transfer_rejects_unknown_parties() {
        let registry = registry();
        let mut chain = Blockchain::new("0000", 0);
        assert_eq!(
            submit(&registry, &mut chain, "Alice", "Carol", "10"),
            Err(LedgerError::UnknownAccount(AccountId::from("Carol")))
        );
        assert_eq!(
            submit(&registry, &mut chain, "Dave", "Bob", "10"),
            Err(LedgerError::UnknownAccount(AccountId::from("Dave")))
        );
    }

    #[test]
    fn create_transfer_rejects_self_transfer() {
        let registry = registry();
        let mut chain = Blockchain::new("0000", 0);
        assert_eq!(
            submit(&registry, &mut chain, "Alice", "Alice", "10"),
            Err(LedgerError::SelfTransfer(AccountId::from("Alice")))
        );
    }

    #[test]
    fn insufficient_balance_counts_pending_and_zakat() {
        let registry = registry();
        let mut chain = Blockchain::new("0000", 0);
        submit(&registry, &mut chain, "Alice", "Bob", "150").unwrap();

        // 200 - 153.75 leaves 46.25; 46 costs 47.15 with zakat
        assert_eq!(
            submit(&registry, &mut chain, "Alice", "Bob", "46"),
            Err(LedgerError::InsufficientBalance {
                account: AccountId::from("Alice"),
                available: amt("46.25"),
                required: amt("47.15"),
            })
        );
        assert_eq!(chain.pending().len(), 1);
    }

    #[test]
    fn exact_balance_can_be_spent() {
        let registry = registry();
        let mut chain = Blockchain::new("0000", 0);
        // 195.12195121 + 2.5% truncated stays within 200
        submit(&registry, &mut chain, "Alice", "Bob", "195.12195121").unwrap();
        assert!(balance_of(&registry, &chain, "Alice", true).unwrap() >= Amount::ZERO);
    }

    #[test]
    fn transfer_timestamp_is_clamped() {
        let registry = registry();
        let mut chain = Blockchain::new("0000", 100);
        let tx = create_transfer(
            &registry,
            &chain,
            "Alice",
            "Bob",
            amt("1"),
            &AccountId::from(ZAKAT),
            5,
        )
        .unwrap();
        assert_eq!(tx.timestamp, 100);
        chain.push_pending(tx);
    }

    #[test]
    fn replay_conserves_total_value() {
        let registry = registry();
        let mut chain = Blockchain::new("0000", 0);
        submit(&registry, &mut chain, "Alice", "Bob", "50").unwrap();
        submit(&registry, &mut chain, "Bob", "Alice", "33.33333333").unwrap();
        chain.mine("1001", 2).unwrap();
        submit(&registry, &mut chain, "Alice", "Bob", "0.00000001").unwrap();

        for include_pending in [false, true] {
            let balances = replay(&registry, &chain, include_pending).unwrap();
            assert_eq!(
                Amount::checked_sum(balances.into_values()),
                Some(Amount::from_coins(400))
            );
        }
    }

    #[test]
    fn replay_matches_single_account_balances() {
        let registry = registry();
        let mut chain = Blockchain::new("0000", 0);
        submit(&registry, &mut chain, "Alice", "Bob", "50").unwrap();
        chain.mine("1001", 2).unwrap();

        let all = replay(&registry, &chain, false).unwrap();
        for id in registry.ids() {
            assert_eq!(
                all[id],
                balance_of(&registry, &chain, id.as_str(), false).unwrap()
            );
        }
    }

    #[test]
    fn delta_stacks_roles() {
        let tx = Transaction::transfer(
            AccountId::from("Alice"),
            AccountId::from(ZAKAT),
            amt("40"),
            AccountId::from(ZAKAT),
            0,
        );
        assert_eq!(delta_for(ZAKAT, &tx), Some(amt("41")));
        assert_eq!(delta_for("Alice", &tx), Some(amt("-41")));
        assert_eq!(delta_for("Bob", &tx), Some(Amount::ZERO));
    }

    #[test]
    fn cache_refreshes_when_chain_grows() {
        let registry = registry();
        let cache = BalanceCache::new();
        let mut chain = Blockchain::new("0000", 0);

        assert_eq!(cache.committed_balance(&registry, &chain, "Bob").unwrap(), amt("200"));
        assert_eq!(cache.len(), 1);

        submit(&registry, &mut chain, "Alice", "Bob", "50").unwrap();
        assert_eq!(cache.committed_balance(&registry, &chain, "Bob").unwrap(), amt("200"));
        assert_eq!(
            cache.balance_including_pending(&registry, &chain, "Bob").unwrap(),
            amt("250")
        );

        chain.mine("1001", 2).unwrap();
        assert_eq!(cache.committed_balance(&registry, &chain, "Bob").unwrap(), amt("250"));
    }

    #[test]
    fn cleared_cache_sees_edited_blocks() {
        let registry = registry();
        let cache = BalanceCache::new();
        let mut chain = Blockchain::new("0000", 0);
        submit(&registry, &mut chain, "Alice", "Bob", "50").unwrap();
        chain.mine("1001", 2).unwrap();
        assert_eq!(cache.committed_balance(&registry, &chain, "Bob").unwrap(), amt("250"));

        chain.block_mut(1).unwrap().transactions[0].amount = amt("500");
        assert_eq!(cache.committed_balance(&registry, &chain, "Bob").unwrap(), amt("250"));

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.committed_balance(&registry, &chain, "Bob").unwrap(), amt("700"));
    }
}
