use crate::script::{RefId, get_push_refs};
use crate::sighash::{OutputDataSummary, refs_hash};
use crate::txid::transaction_id;
use radiant_consensus_core::tx::{Transaction, TransactionId, UtxoEntry};
use radiant_hashes::{DoubleSha256, Hash, Hasher};
use radiant_txscript_errors::ScriptError;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use thiserror::Error;

pub const REF_TYPE_NONE: i64 = 0;
pub const REF_TYPE_NORMAL: i64 = 1;
pub const REF_TYPE_SINGLETON: i64 = 2;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    #[error("input index {index} is out of range for a transaction with {inputs} inputs")]
    InputIndexOutOfRange { index: usize, inputs: usize },

    #[error("{coins} coins given for a transaction with {inputs} inputs")]
    CoinCountMismatch { coins: usize, inputs: usize },

    #[error("cannot compute the transaction id: {0}")]
    TransactionId(ScriptError),
}

/// What the reference opcodes know about one locking script.
#[derive(Debug, Clone, Default)]
struct ScriptSummary {
    push_refs: BTreeSet<RefId>,
    state_separator_index: u32,
    data_summary: Hash,
    code_script_hash: Hash,
}

#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    value_sum: i64,
    count: i64,
    zero_valued_count: i64,
}

impl Totals {
    fn add(&mut self, value: i64) {
        self.value_sum = self.value_sum.saturating_add(value);
        self.count += 1;
        if value == 0 {
            self.zero_valued_count += 1;
        }
    }
}

/// Aggregates over one side of a transaction, either the coins it spends or the
/// outputs it creates.
#[derive(Debug, Default)]
struct SideIndex {
    scripts: Vec<ScriptSummary>,
    by_refs_hash: HashMap<Hash, i64>,
    by_ref: HashMap<RefId, Totals>,
    ref_types: HashMap<RefId, i64>,
    by_code_script_hash: HashMap<Hash, Totals>,
}

impl SideIndex {
    /// Entries set to `None` are unknown (spent coins of a limited context); they keep
    /// their position but contribute to no aggregate.
    fn build<'a>(entries: impl Iterator<Item = Option<(i64, &'a [u8])>>) -> Self {
        let mut index = SideIndex::default();
        for entry in entries {
            let Some((value, script)) = entry else {
                index.scripts.push(ScriptSummary::default());
                continue;
            };

            let (push_refs, singletons, state_separator_index) = match get_push_refs(script) {
                Ok(refs) => (refs.push, refs.singleton, refs.state_separator_index),
                Err(err) => {
                    log::debug!("script without usable references: {err}");
                    (BTreeSet::new(), BTreeSet::new(), 0)
                }
            };

            let code_script_hash = DoubleSha256::hash(script.get(state_separator_index as usize..).unwrap_or_default());
            let data_summary = OutputDataSummary::from_push_refs(value, script, &push_refs).hash();

            let sum = index.by_refs_hash.entry(refs_hash(&push_refs)).or_default();
            *sum = sum.saturating_add(value);
            index.by_code_script_hash.entry(code_script_hash).or_default().add(value);
            for id in push_refs.iter() {
                index.by_ref.entry(*id).or_default().add(value);
                let ref_type = if singletons.contains(id) { REF_TYPE_SINGLETON } else { REF_TYPE_NORMAL };
                let known = index.ref_types.entry(*id).or_insert(ref_type);
                *known = (*known).max(ref_type);
            }

            index.scripts.push(ScriptSummary { push_refs, state_separator_index, data_summary, code_script_hash });
        }
        index
    }

    fn script(&self, index: usize) -> Option<&ScriptSummary> {
        self.scripts.get(index)
    }

    fn ref_totals(&self, id: &RefId) -> Totals {
        self.by_ref.get(id).copied().unwrap_or_default()
    }

    fn code_totals(&self, hash: &Hash) -> Totals {
        self.by_code_script_hash.get(hash).copied().unwrap_or_default()
    }

    fn ref_type(&self, id: &RefId) -> i64 {
        self.ref_types.get(id).copied().unwrap_or(REF_TYPE_NONE)
    }
}

/// Data shared by the contexts of every input of one transaction.
#[derive(Debug)]
struct Shared {
    tx: Transaction,
    coins: Vec<UtxoEntry>,
    tx_id: TransactionId,
    utxos: SideIndex,
    outputs: SideIndex,
}

impl Shared {
    fn new(tx: Transaction, coins: Vec<UtxoEntry>) -> Result<Self, ContextError> {
        if coins.len() != tx.inputs.len() {
            return Err(ContextError::CoinCountMismatch { coins: coins.len(), inputs: tx.inputs.len() });
        }
        let tx_id = transaction_id(&tx).map_err(ContextError::TransactionId)?;
        let utxos = SideIndex::build(
            coins.iter().map(|coin| (!coin.is_spent()).then_some((coin.amount, coin.script_public_key.as_slice()))),
        );
        let outputs = SideIndex::build(tx.outputs.iter().map(|output| Some((output.value, output.script_public_key.as_slice()))));
        Ok(Self { tx, coins, tx_id, utxos, outputs })
    }
}

/// Everything the introspection and reference opcodes may read while one input of a
/// transaction is verified: the transaction itself, the coins it spends and the
/// reference aggregates precomputed over both.
///
/// Contexts of the inputs of one transaction share their data, cloning is cheap.
#[derive(Debug, Clone)]
pub struct ScriptExecutionContext {
    input_index: usize,
    limited: bool,
    shared: Arc<Shared>,
}

impl ScriptExecutionContext {
    /// Context for `input_index` given the coins spent by every input, in input order.
    pub fn new(input_index: usize, coins: Vec<UtxoEntry>, tx: Transaction) -> Result<Self, ContextError> {
        ensure_input_in_range(input_index, &tx)?;
        Ok(Self { input_index, limited: false, shared: Arc::new(Shared::new(tx, coins)?) })
    }

    /// Context that only knows the coin spent by `input_index`. Queries about the coins
    /// of other inputs fail with [`ScriptError::LimitedContextNoSiblingInfo`].
    pub fn new_limited(input_index: usize, script_pub_key: Vec<u8>, amount: i64, tx: Transaction) -> Result<Self, ContextError> {
        ensure_input_in_range(input_index, &tx)?;
        let mut coins = vec![UtxoEntry::spent(); tx.inputs.len()];
        coins[input_index] = UtxoEntry::new(amount, script_pub_key, 1, false);
        Ok(Self { input_index, limited: true, shared: Arc::new(Shared::new(tx, coins)?) })
    }

    /// One context per input, all sharing a single precomputation.
    pub fn create_for_all_inputs(tx: Transaction, coins: Vec<UtxoEntry>) -> Result<Vec<Self>, ContextError> {
        let shared = Arc::new(Shared::new(tx, coins)?);
        Ok((0..shared.tx.inputs.len()).map(|input_index| Self { input_index, limited: false, shared: shared.clone() }).collect())
    }

    pub fn input_index(&self) -> usize {
        self.input_index
    }

    pub fn is_limited(&self) -> bool {
        self.limited
    }

    pub fn tx(&self) -> &Transaction {
        &self.shared.tx
    }

    /// The id of [`Self::tx`], version 3 aware.
    pub fn tx_id(&self) -> TransactionId {
        self.shared.tx_id
    }

    /// The coin spent by input `index`. In a limited context the coins of other inputs
    /// are [`UtxoEntry::spent`].
    pub fn coin(&self, index: usize) -> Option<&UtxoEntry> {
        self.shared.coins.get(index)
    }

    pub fn coin_amount(&self, index: usize) -> Option<i64> {
        self.coin(index).map(|coin| coin.amount)
    }

    pub fn coin_script_pub_key(&self, index: usize) -> Option<&[u8]> {
        self.coin(index).map(|coin| coin.script_public_key.as_slice())
    }

    pub fn script_sig(&self, index: usize) -> Option<&[u8]> {
        self.tx().inputs.get(index).map(|input| input.signature_script.as_slice())
    }

    /// Fails unless `index` designates an input whose coin is known.
    pub(crate) fn check_utxo_index(&self, index: i64) -> Result<usize, ScriptError> {
        let index = usize::try_from(index)
            .ok()
            .filter(|&i| i < self.tx().inputs.len())
            .ok_or(ScriptError::InvalidTxInputIndex)?;
        self.check_sibling(index)?;
        Ok(index)
    }

    pub(crate) fn check_input_index(&self, index: i64) -> Result<usize, ScriptError> {
        usize::try_from(index).ok().filter(|&i| i < self.tx().inputs.len()).ok_or(ScriptError::InvalidTxInputIndex)
    }

    pub(crate) fn check_output_index(&self, index: i64) -> Result<usize, ScriptError> {
        usize::try_from(index).ok().filter(|&i| i < self.tx().outputs.len()).ok_or(ScriptError::InvalidTxOutputIndex)
    }

    pub(crate) fn check_sibling(&self, index: usize) -> Result<(), ScriptError> {
        match self.limited && index != self.input_index {
            true => Err(ScriptError::LimitedContextNoSiblingInfo),
            false => Ok(()),
        }
    }

    /// sha256d of `value ‖ sha256d(script) ‖ ref_count ‖ refs_hash` of the coin spent by
    /// input `index`.
    pub fn ref_hash_data_summary_utxo(&self, index: usize) -> Option<Hash> {
        self.shared.utxos.script(index).map(|s| s.data_summary)
    }

    pub fn ref_hash_data_summary_output(&self, index: usize) -> Option<Hash> {
        self.shared.outputs.script(index).map(|s| s.data_summary)
    }

    /// Total value of the coins whose sorted push references hash to `refs_hash`. Coins
    /// without references are found under the zero hash.
    pub fn ref_hash_value_sum_utxos(&self, refs_hash: &Hash) -> i64 {
        self.shared.utxos.by_refs_hash.get(refs_hash).copied().unwrap_or_default()
    }

    pub fn ref_hash_value_sum_outputs(&self, refs_hash: &Hash) -> i64 {
        self.shared.outputs.by_refs_hash.get(refs_hash).copied().unwrap_or_default()
    }

    pub fn ref_value_sum_utxos(&self, id: &RefId) -> i64 {
        self.shared.utxos.ref_totals(id).value_sum
    }

    pub fn ref_value_sum_outputs(&self, id: &RefId) -> i64 {
        self.shared.outputs.ref_totals(id).value_sum
    }

    /// Number of coins pushing `id`, each counted once however often it pushes it.
    pub fn ref_output_count_utxos(&self, id: &RefId) -> i64 {
        self.shared.utxos.ref_totals(id).count
    }

    pub fn ref_output_count_outputs(&self, id: &RefId) -> i64 {
        self.shared.outputs.ref_totals(id).count
    }

    pub fn ref_output_zero_valued_count_utxos(&self, id: &RefId) -> i64 {
        self.shared.utxos.ref_totals(id).zero_valued_count
    }

    pub fn ref_output_zero_valued_count_outputs(&self, id: &RefId) -> i64 {
        self.shared.outputs.ref_totals(id).zero_valued_count
    }

    /// [`REF_TYPE_SINGLETON`] if any coin pushes `id` as a singleton,
    /// [`REF_TYPE_NORMAL`] if it is only pushed normally, [`REF_TYPE_NONE`] otherwise.
    pub fn ref_type_utxo(&self, id: &RefId) -> i64 {
        self.shared.utxos.ref_type(id)
    }

    pub fn ref_type_output(&self, id: &RefId) -> i64 {
        self.shared.outputs.ref_type(id)
    }

    /// Byte offset just past the OP_STATESEPARATOR of the coin script, zero without one.
    pub fn state_separator_index_utxo(&self, index: usize) -> Option<u32> {
        self.shared.utxos.script(index).map(|s| s.state_separator_index)
    }

    pub fn state_separator_index_output(&self, index: usize) -> Option<u32> {
        self.shared.outputs.script(index).map(|s| s.state_separator_index)
    }

    pub fn refs_per_utxo(&self, index: usize) -> Option<&BTreeSet<RefId>> {
        self.shared.utxos.script(index).map(|s| &s.push_refs)
    }

    pub fn refs_per_output(&self, index: usize) -> Option<&BTreeSet<RefId>> {
        self.shared.outputs.script(index).map(|s| &s.push_refs)
    }

    /// Total value of the coins whose code script (the part after the state
    /// separator) hashes to `code_script_hash`.
    pub fn code_script_hash_value_sum_utxos(&self, code_script_hash: &Hash) -> i64 {
        self.shared.utxos.code_totals(code_script_hash).value_sum
    }

    pub fn code_script_hash_value_sum_outputs(&self, code_script_hash: &Hash) -> i64 {
        self.shared.outputs.code_totals(code_script_hash).value_sum
    }

    pub fn code_script_hash_output_count_utxos(&self, code_script_hash: &Hash) -> i64 {
        self.shared.utxos.code_totals(code_script_hash).count
    }

    pub fn code_script_hash_output_count_outputs(&self, code_script_hash: &Hash) -> i64 {
        self.shared.outputs.code_totals(code_script_hash).count
    }

    pub fn code_script_hash_zero_valued_output_count_utxos(&self, code_script_hash: &Hash) -> i64 {
        self.shared.utxos.code_totals(code_script_hash).zero_valued_count
    }

    pub fn code_script_hash_zero_valued_output_count_outputs(&self, code_script_hash: &Hash) -> i64 {
        self.shared.outputs.code_totals(code_script_hash).zero_valued_count
    }
}

fn ensure_input_in_range(index: usize, tx: &Transaction) -> Result<(), ContextError> {
    match index < tx.inputs.len() {
        true => Ok(()),
        false => Err(ContextError::InputIndexOutOfRange { index, inputs: tx.inputs.len() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcodes::codes;
    use crate::script_builder::ScriptBuilder;
    use radiant_consensus_core::tx::{TransactionInput, TransactionOutpoint, TransactionOutput};
    use radiant_hashes::ZERO_HASH;

    fn id(fill: u8) -> RefId {
        RefId::from_bytes([fill; 36])
    }

    fn token_script(op: u8, ref_fill: u8, code: &[u8]) -> Vec<u8> {
        ScriptBuilder::new()
            .add_ref_op(op, id(ref_fill).as_bytes())
            .add_op(codes::OpDrop)
            .add_op(codes::OpStateSeparator)
            .add_ops(code)
            .drain()
    }

    fn test_tx(outputs: Vec<TransactionOutput>, inputs: usize) -> Transaction {
        let inputs = (0..inputs)
            .map(|i| TransactionInput::new(TransactionOutpoint::new(Hash::from_bytes([9; 32]), i as u32), vec![], 0))
            .collect();
        Transaction::new(2, inputs, outputs, 0)
    }

    #[test]
    fn test_output_aggregates() {
        let code = [codes::OpTrue];
        let outputs = vec![
            TransactionOutput::new(1000, token_script(codes::OpPushInputRef, 1, &code)),
            TransactionOutput::new(0, token_script(codes::OpPushInputRef, 1, &code)),
            TransactionOutput::new(500, token_script(codes::OpPushInputRefSingleton, 2, &code)),
            TransactionOutput::new(7, vec![codes::OpTrue]),
            // Unparseable: truncated reference operand
            TransactionOutput::new(3, vec![codes::OpPushInputRef, 0x01]),
        ];
        let ctx = ScriptExecutionContext::new(0, vec![UtxoEntry::new(1, vec![], 1, false)], test_tx(outputs.clone(), 1))
            .expect("valid context");

        assert_eq!(ctx.ref_value_sum_outputs(&id(1)), 1000);
        assert_eq!(ctx.ref_output_count_outputs(&id(1)), 2);
        assert_eq!(ctx.ref_output_zero_valued_count_outputs(&id(1)), 1);
        assert_eq!(ctx.ref_type_output(&id(1)), REF_TYPE_NORMAL);
        assert_eq!(ctx.ref_type_output(&id(2)), REF_TYPE_SINGLETON);
        assert_eq!(ctx.ref_type_output(&id(3)), REF_TYPE_NONE);
        assert_eq!(ctx.ref_value_sum_outputs(&id(3)), 0);

        let one_ref_hash = refs_hash(&BTreeSet::from([id(1)]));
        assert_eq!(ctx.ref_hash_value_sum_outputs(&one_ref_hash), 1000);
        // Outputs without references, including the unparseable one
        assert_eq!(ctx.ref_hash_value_sum_outputs(&ZERO_HASH), 10);

        // Everything after the separator is the shared code script
        let code_hash = DoubleSha256::hash(code);
        assert_eq!(ctx.code_script_hash_value_sum_outputs(&code_hash), 1507);
        assert_eq!(ctx.code_script_hash_output_count_outputs(&code_hash), 4);
        assert_eq!(ctx.code_script_hash_zero_valued_output_count_outputs(&code_hash), 1);

        assert_eq!(ctx.state_separator_index_output(0), Some(39));
        assert_eq!(ctx.state_separator_index_output(3), Some(0));
        assert_eq!(ctx.state_separator_index_output(4), Some(0));
        assert_eq!(ctx.state_separator_index_output(5), None);

        assert_eq!(ctx.refs_per_output(2).map(|refs| refs.len()), Some(1));
        assert!(ctx.refs_per_output(4).is_some_and(|refs| refs.is_empty()));

        let expected = OutputDataSummary::new(1000, &outputs[0].script_public_key).expect("parsable").hash();
        assert_eq!(ctx.ref_hash_data_summary_output(0), Some(expected));
    }

    #[test]
    fn test_utxo_aggregates_and_limited_context() {
        let coins = vec![
            UtxoEntry::new(40, token_script(codes::OpPushInputRef, 5, &[codes::OpTrue]), 10, false),
            UtxoEntry::new(60, token_script(codes::OpPushInputRef, 5, &[codes::OpTrue]), 10, false),
        ];
        let tx = test_tx(vec![TransactionOutput::new(90, vec![codes::OpTrue])], 2);

        let contexts = ScriptExecutionContext::create_for_all_inputs(tx.clone(), coins.clone()).expect("valid contexts");
        assert_eq!(contexts.len(), 2);
        assert_eq!(contexts[1].input_index(), 1);
        assert!(Arc::ptr_eq(&contexts[0].shared, &contexts[1].shared));
        assert_eq!(contexts[0].ref_value_sum_utxos(&id(5)), 100);
        assert_eq!(contexts[0].ref_output_count_utxos(&id(5)), 2);
        assert_eq!(contexts[1].coin_amount(0), Some(40));
        assert_eq!(contexts[0].check_utxo_index(1), Ok(1));

        let limited = ScriptExecutionContext::new_limited(1, coins[1].script_public_key.clone(), 60, tx.clone())
            .expect("valid context");
        assert!(limited.is_limited());
        assert!(limited.coin(0).is_some_and(|coin| coin.is_spent()));
        assert_eq!(limited.ref_value_sum_utxos(&id(5)), 60);
        assert_eq!(limited.check_utxo_index(0), Err(ScriptError::LimitedContextNoSiblingInfo));
        assert_eq!(limited.check_utxo_index(1), Ok(1));
        assert_eq!(limited.check_utxo_index(2), Err(ScriptError::InvalidTxInputIndex));
        assert_eq!(limited.check_utxo_index(-1), Err(ScriptError::InvalidTxInputIndex));
        assert_eq!(limited.check_output_index(1), Err(ScriptError::InvalidTxOutputIndex));
    }

    #[test]
    fn test_construction_errors() {
        let tx = test_tx(vec![], 2);
        assert_eq!(
            ScriptExecutionContext::new(0, vec![], tx.clone()).map(|_| ()),
            Err(ContextError::CoinCountMismatch { coins: 0, inputs: 2 })
        );
        assert_eq!(
            ScriptExecutionContext::new_limited(2, vec![], 0, tx.clone()).map(|_| ()),
            Err(ContextError::InputIndexOutOfRange { index: 2, inputs: 2 })
        );

        let mut v3 = test_tx(vec![TransactionOutput::new(1, vec![codes::OpPushInputRef])], 1);
        v3.version = 3;
        assert_eq!(
            ScriptExecutionContext::new(0, vec![UtxoEntry::new(1, vec![], 1, false)], v3).map(|_| ()),
            Err(ContextError::TransactionId(ScriptError::Unknown))
        );
    }
}
