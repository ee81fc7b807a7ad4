//! Protocol parameters.
//!
//! A transaction builder needs the current protocol parameters to size fees, deposits,
//! collateral and script budgets. Data providers serve them as JSON; [`ProtocolParameters`]
//! deserializes that form directly, and any field a provider omits falls back to the
//! mainnet value.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::script::ExUnits;
use crate::value::Lovelace;

/// The ledger's protocol parameters, as far as transaction construction is concerned.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProtocolParameters {
    pub epoch: u64,
    /// The per-byte fee coefficient.
    pub min_fee_a: u64,
    /// The constant fee term.
    pub min_fee_b: u64,
    pub max_block_size: u64,
    pub max_tx_size: u64,
    pub max_block_header_size: u64,
    pub key_deposit: u64,
    pub pool_deposit: u64,
    pub min_pool_cost: u64,
    /// The price of one unit of script memory, in lovelace.
    pub price_mem: Decimal,
    /// The price of one script CPU step, in lovelace.
    pub price_step: Decimal,
    pub max_tx_ex_mem: u64,
    pub max_tx_ex_steps: u64,
    pub max_block_ex_mem: u64,
    pub max_block_ex_steps: u64,
    pub max_val_size: u64,
    /// The collateral required, as a percentage of the fee.
    pub collateral_percent: u64,
    pub max_collateral_inputs: u32,
    pub coins_per_utxo_size: u64,
    pub min_fee_ref_script_cost_per_byte: u64,
}

impl Default for ProtocolParameters {
    fn default() -> Self {
        ProtocolParameters {
            epoch: 0,
            min_fee_a: 44,
            min_fee_b: 155_381,
            max_block_size: 98_304,
            max_tx_size: 16_384,
            max_block_header_size: 1_100,
            key_deposit: 2_000_000,
            pool_deposit: 500_000_000,
            min_pool_cost: 340_000_000,
            price_mem: Decimal::new(577, 4),
            price_step: Decimal::new(721, 7),
            max_tx_ex_mem: 14_000_000,
            max_tx_ex_steps: 10_000_000_000,
            max_block_ex_mem: 62_000_000,
            max_block_ex_steps: 20_000_000_000,
            max_val_size: 5_000,
            collateral_percent: 150,
            max_collateral_inputs: 3,
            coins_per_utxo_size: 4_310,
            min_fee_ref_script_cost_per_byte: 15,
        }
    }
}

impl ProtocolParameters {
    /// Returns the size-based part of the fee for a transaction of `tx_size` bytes.
    ///
    /// Returns `None` if the result would exceed the monetary range.
    pub fn min_fee(&self, tx_size: u64) -> Option<Lovelace> {
        let fee = self
            .min_fee_a
            .checked_mul(tx_size)?
            .checked_add(self.min_fee_b)?;
        Lovelace::from_u64(fee).ok()
    }

    /// Returns the fee for executing scripts within the given budget, rounded up to the
    /// next lovelace.
    pub fn script_fee(&self, budget: &ExUnits) -> Option<Lovelace> {
        let cost = self
            .price_mem
            .checked_mul(Decimal::from(budget.mem))?
            .checked_add(self.price_step.checked_mul(Decimal::from(budget.steps))?)?;
        Lovelace::from_u64(cost.ceil().to_u64()?).ok()
    }

    /// Returns the minimum collateral that must back a transaction paying `fee`.
    pub fn min_collateral(&self, fee: Lovelace) -> Option<Lovelace> {
        let required = Decimal::from(fee.into_u64())
            .checked_mul(Decimal::from(self.collateral_percent))?
            .checked_div(Decimal::ONE_HUNDRED)?;
        Lovelace::from_u64(required.ceil().to_u64()?).ok()
    }

    /// Returns the execution budget a whole transaction may use.
    pub fn max_tx_ex_units(&self) -> ExUnits {
        ExUnits::new(self.max_tx_ex_mem, self.max_tx_ex_steps)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::ProtocolParameters;
    use crate::script::{ExUnits, DEFAULT_REDEEMER_BUDGET};
    use crate::value::Lovelace;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let params: ProtocolParameters = serde_json::from_str(
            r#"{ "epoch": 512, "minFeeA": 45, "priceMem": "0.06", "maxCollateralInputs": 2 }"#,
        )
        .unwrap();
        assert_eq!(params.epoch, 512);
        assert_eq!(params.min_fee_a, 45);
        assert_eq!(params.price_mem, Decimal::new(6, 2));
        assert_eq!(params.max_collateral_inputs, 2);
        assert_eq!(params.min_fee_b, ProtocolParameters::default().min_fee_b);
        assert_eq!(params.price_step, Decimal::new(721, 7));
    }

    #[test]
    fn fees() {
        let params = ProtocolParameters::default();
        assert_eq!(
            params.min_fee(300),
            Some(Lovelace::const_from_u64(44 * 300 + 155_381))
        );
        assert_eq!(params.min_fee(u64::MAX), None);

        // 7_000_000 * 0.0577 + 3_000_000_000 * 0.0000721 = 403_900 + 216_300
        assert_eq!(
            params.script_fee(&DEFAULT_REDEEMER_BUDGET),
            Some(Lovelace::const_from_u64(620_200))
        );
        assert_eq!(
            params.script_fee(&ExUnits::new(1, 1)),
            Some(Lovelace::const_from_u64(1))
        );
    }

    #[test]
    fn collateral_rounds_up() {
        let params = ProtocolParameters::default();
        assert_eq!(
            params.min_collateral(Lovelace::const_from_u64(201)),
            Some(Lovelace::const_from_u64(302))
        );
    }
}
