use assert_matches::assert_matches;

use ledger_builder::{
    certificate::{Certificate, CertificateKind},
    engine::LedgerEngine,
    input::TxInput,
    mint::MintScript,
    signing::WitnessSet,
    testing::{arb_key_pairs, key_pair, MockEngine, MockFetcher},
    withdrawal::Withdrawal,
    BuildError, Error, TxBuilder,
};
use ledger_protocol::{
    consensus::Network,
    data::{BuilderData, PlutusData},
    params::ProtocolParameters,
    script::{ExUnits, LanguageVersion},
    value::{AssetName, AssetUnit, Value},
    Address, KeyHash, ScriptHash, TxInputRef,
};
use proptest::prelude::*;

const SCRIPT_ADDRESS: &str = "addr_test1wpnlxv2xv9a9ucvnvzqakwepzl9ltx7jzgm53av2e9ncv4sysemm8";
const WALLET_ADDRESS: &str = "addr_test1qpvx0sacufuypa2k4sngk7q40zc5c4npl337uusdh64kv0uafhxhu32dys6pvn6wlw8dav6cmp4pmtv7cc3yenfrw2asfk9uc7";
const REWARD_ADDRESS: &str = "stake_test17rphkx6acpnf78fuvxn0mkew3l0fd058hzquvz7w36x4gtcljw6kf";
const STAKE_KEY_ADDRESS: &str = "stake_test1uzx0ksy9f4qnj2mzfdncqyjy84sszh64w43853nug5pedjgytgke9";

/// Decodes a transaction produced by [`MockEngine`].
fn decode(tx_hex: &str) -> (Vec<u8>, WitnessSet, Option<String>) {
    let bytes = hex::decode(tx_hex).unwrap();
    postcard::from_bytes(&bytes).unwrap()
}

#[test]
fn unlock_mint_and_withdraw() {
    let engine = MockEngine::new();
    let policy = ScriptHash::from_bytes([0xa1; 28]);
    let token_name = b"receipt";
    let script_utxo = TxInputRef::fake(1);
    let wallet_utxo = TxInputRef::fake(2);
    let reference_utxo = TxInputRef::fake(3);

    // The fetcher knows about the script output and the wallet's collateral.
    let fetcher = MockFetcher::new()
        .with_utxo(script_utxo, SCRIPT_ADDRESS, Value::lovelace(10_000_000))
        .with_utxo(wallet_utxo, WALLET_ADDRESS, Value::lovelace(5_000_000));

    let mut builder = TxBuilder::new(&engine);
    builder
        .network(Network::Preprod)
        .unwrap()
        .protocol_params(ProtocolParameters::default())
        .unwrap()
        // Unlock the script output, whose datum is stored inline.
        .spending_plutus_script(LanguageVersion::V2)
        .unwrap()
        .tx_in(script_utxo, None, None)
        .unwrap()
        .spending_tx_in_reference(reference_utxo, policy, Some(1_200))
        .unwrap()
        .tx_in_inline_datum_present()
        .unwrap()
        .tx_in_redeemer_value(
            BuilderData::json(r#"{"constructor":0,"fields":[{"int":42}]}"#).unwrap(),
            Some(ExUnits::new(1_000_000, 400_000_000)),
        )
        .unwrap()
        .tx_in(wallet_utxo, None, None)
        .unwrap()
        .tx_in_collateral(wallet_utxo, None, None)
        .unwrap()
        // Mint a receipt token under the same script.
        .mint_plutus_script(LanguageVersion::V2)
        .unwrap()
        .mint(1, policy, token_name)
        .unwrap()
        .mint_tx_in_reference(reference_utxo, policy, LanguageVersion::V2, Some(1_200))
        .unwrap()
        .mint_redeemer_value(PlutusData::unit(), None)
        .unwrap()
        // Withdraw the script's staking rewards.
        .withdrawal_plutus_script(LanguageVersion::V2)
        .unwrap()
        .withdrawal(REWARD_ADDRESS, 0)
        .unwrap()
        .withdrawal_tx_in_reference(reference_utxo, policy, Some(1_200))
        .unwrap()
        .withdrawal_redeemer_value(PlutusData::unit(), None)
        .unwrap()
        // Delegate the wallet's stake, witnessed by the wallet key.
        .delegate_stake_certificate(STAKE_KEY_ADDRESS, KeyHash::from_bytes([0xc3; 28]))
        .unwrap()
        // Send the token to the wallet.
        .tx_out(
            WALLET_ADDRESS,
            Value::lovelace(2_000_000)
                .with(
                    AssetUnit::token(policy, AssetName::new(&token_name[..]).unwrap()),
                    1,
                )
                .unwrap(),
        )
        .unwrap()
        .required_signer_hash(KeyHash::from_bytes([0xb2; 28]))
        .unwrap()
        .change_address(WALLET_ADDRESS)
        .unwrap()
        .metadata_value(674, &serde_json::json!({ "msg": ["receipt minted"] }))
        .unwrap();

    builder.resolve_inputs(&fetcher).unwrap();
    let hash = builder.finalize().unwrap();
    assert_eq!(builder.body_hash(), Some(&hash));

    let body = &engine.built_bodies()[0];
    assert_eq!(body.network, Network::Preprod);
    assert_eq!(body.inputs.len(), 2);
    assert!(body.inputs.iter().all(|i| i.input().is_resolved()));
    assert_matches!(&body.inputs[0], TxInput::Script { witness, .. } => {
        assert_eq!(witness.redeemer.index, Some(0));
        assert_eq!(witness.redeemer.ex_units, ExUnits::new(1_000_000, 400_000_000));
    });
    assert_matches!(&body.inputs[1], TxInput::PubKey(_));
    assert_eq!(body.collaterals[0].address, Some(Address::from(WALLET_ADDRESS)));
    assert_matches!(&body.mints[0].script, MintScript::Plutus { redeemer, .. } => {
        assert_eq!(redeemer.index, Some(0));
    });
    assert_matches!(&body.withdrawals[0], Withdrawal::Script { redeemer, .. } => {
        assert_eq!(redeemer.index, Some(0));
    });
    assert_matches!(
        &body.certificates[..],
        [Certificate::Basic(CertificateKind::DelegateStake { address, .. })]
            if address.to_string() == STAKE_KEY_ADDRESS
    );
    assert_eq!(body.outputs[0].amount.coin(), 2_000_000);
    assert!(body.has_plutus_scripts());

    // The mock engine priced the body, and the wallet input covers the collateral.
    let fee = engine.fee_estimates()[0];
    let collateral = fee.collateral.unwrap();
    assert!(collateral.into_u64() > fee.fee.into_u64());
    assert!(collateral.into_u64() < 5_000_000);

    // Both parties sign, in either order.
    let (payer_sk, payer_vk) = key_pair(1);
    let (cosigner_sk, cosigner_vk) = key_pair(2);
    builder
        .sign(&cosigner_sk, &cosigner_vk)
        .unwrap()
        .sign(&payer_sk, &payer_vk)
        .unwrap();

    let tx_hex = builder.complete_signing().unwrap();
    let (encoded_body, witness_set, metadata) = decode(&tx_hex);
    assert_eq!(encoded_body, builder.unsigned_body().unwrap().body);
    assert_eq!(witness_set.vkey_witnesses.len(), 2);
    assert_eq!(witness_set.redeemers.len(), 3);
    // Every script was supplied by reference.
    assert!(witness_set.plutus_scripts.is_empty());
    assert_eq!(
        metadata.as_deref(),
        Some(r#"{"674":{"msg":["receipt minted"]}}"#)
    );

    // Each signature verifies against the body hash.
    for (vk, sk) in [(&payer_vk, &payer_sk), (&cosigner_vk, &cosigner_sk)] {
        let expected = engine.sign(&hash, sk).unwrap();
        assert_matches!(
            witness_set.vkey_witnesses.iter().find(|(k, _)| k.as_bytes() == &vk[..]),
            Some((_, signature)) if signature == &expected
        );
    }
}

#[test]
fn failed_item_does_not_poison_the_builder() {
    let engine = MockEngine::new();
    let mut builder = TxBuilder::new(&engine);

    // A Plutus input with no redeemer is reported when the next input is named.
    builder
        .spending_plutus_script(LanguageVersion::V3)
        .unwrap()
        .tx_in(TxInputRef::fake(1), Some(Value::lovelace(1)), None)
        .unwrap()
        .tx_in_script(vec![0x58, 0x01])
        .unwrap()
        .tx_in_datum_value(PlutusData::unit())
        .unwrap();
    assert_matches!(
        builder.tx_in(TxInputRef::fake(2), Some(Value::lovelace(1)), None),
        Err(Error::IncompleteScriptInput { .. })
    );

    // The builder can still be used to produce a valid transaction.
    builder
        .tx_in(TxInputRef::fake(2), Some(Value::lovelace(1)), None)
        .unwrap()
        .tx_out(WALLET_ADDRESS, Value::lovelace(1))
        .unwrap();
    builder.finalize().unwrap();
    assert_eq!(builder.body().inputs.len(), 1);
    assert_eq!(*builder.body().inputs[0].tx_ref(), TxInputRef::fake(2));
}

#[test]
fn rejected_body_can_be_retried() {
    let rejecting = MockEngine::rejecting();
    let mut builder = TxBuilder::new(&rejecting);
    builder
        .tx_in(TxInputRef::fake(1), Some(Value::lovelace(1)), None)
        .unwrap();
    assert_matches!(builder.finalize(), Err(BuildError::Engine(_)));

    // Nothing was finalized, so the transaction can still be changed.
    builder.tx_out(WALLET_ADDRESS, Value::lovelace(1)).unwrap();
    assert_matches!(
        builder.sign(&key_pair(1).0, &key_pair(1).1),
        Err(BuildError::Builder(Error::NotFinalized))
    );
}

proptest! {
    #[test]
    fn signing_order_does_not_change_the_transaction(
        keys in arb_key_pairs(8).prop_shuffle()
    ) {
        let engine = MockEngine::new();
        let build = |keys: &[(Vec<u8>, Vec<u8>)]| {
            let mut builder = TxBuilder::new(&engine);
            builder
                .tx_in(TxInputRef::fake(1), Some(Value::lovelace(10)), None)
                .unwrap()
                .tx_out(WALLET_ADDRESS, Value::lovelace(10))
                .unwrap();
            builder.finalize().unwrap();
            for (sk, vk) in keys {
                builder.sign(sk, vk).unwrap();
            }
            builder.complete_signing().unwrap()
        };

        let mut sorted = keys.clone();
        sorted.sort();
        let shuffled_tx = build(&keys);
        prop_assert_eq!(&shuffled_tx, &build(&sorted));
        prop_assert_eq!(decode(&shuffled_tx).1.vkey_witnesses.len(), keys.len());
    }
}
