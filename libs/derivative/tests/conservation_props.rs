//! Property tests over random trade sequences
//!
//! Whatever the sequence, collateral held backs every A
//! and every B in existence, pool reserves included, and a rejected
//! operation leaves the derivative exactly as it was.

use amm::{FeeSchedule, Payoff, PayoffKind};
use derivative::{
    Derivative, DerivativeParams, InitArgs, ManualClock, ManualReference, SharedCollateral,
    TokenKind,
};
use ledger::TokenLedger;
use proptest::prelude::*;
use types::{Address, U256, UNIT};

const OPERATOR: Address = Address::from_low_u8(0x01);
const USER: Address = Address::from_low_u8(0x02);
const DERIVATIVE: Address = Address::from_low_u8(0xd0);
const MINTER: Address = Address::from_low_u8(0xee);

type Instance = Derivative<SharedCollateral, ManualReference, ManualClock>;

#[derive(Debug, Clone)]
enum Op {
    Mint(u64),
    MintA(u64),
    MintB(u64),
    MintLp(u64),
    Burn(u64),
    BurnA(u64),
    BurnB(u64),
    BurnExactA(u64),
    BurnExactB(u64),
    BurnLp(u64),
    SwapAToB(u64),
    SwapBToA(u64),
    Deposit(u64),
    Withdraw(u64),
    Wait(u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let units = 1u64..1_000;
    let pct = 1u64..60;
    prop_oneof![
        units.clone().prop_map(Op::Mint),
        units.clone().prop_map(Op::MintA),
        units.clone().prop_map(Op::MintB),
        units.prop_map(Op::MintLp),
        pct.clone().prop_map(Op::Burn),
        pct.clone().prop_map(Op::BurnA),
        pct.clone().prop_map(Op::BurnB),
        pct.clone().prop_map(Op::BurnExactA),
        pct.clone().prop_map(Op::BurnExactB),
        pct.clone().prop_map(Op::BurnLp),
        pct.clone().prop_map(Op::SwapAToB),
        pct.clone().prop_map(Op::SwapBToA),
        pct.clone().prop_map(Op::Deposit),
        pct.prop_map(Op::Withdraw),
        (1u64..3_600).prop_map(Op::Wait),
    ]
}

fn instance() -> (Instance, SharedCollateral, ManualClock) {
    let mut ledger = TokenLedger::new(Address::from_low_u8(0xc0));
    ledger.init(MINTER, "Collateral", "COL", 18).unwrap();
    for holder in [OPERATOR, USER] {
        ledger.mint(&MINTER, holder, UNIT * 1_000_000u64).unwrap();
        ledger.approve(&holder, DERIVATIVE, U256::MAX).unwrap();
    }
    let collateral = SharedCollateral::new(ledger);
    let clock = ManualClock::new(1_000_000);

    let params = DerivativeParams {
        payoff: Payoff::new(PayoffKind::Delta, UNIT * 3u64),
        fee_schedule: FeeSchedule::Decreasing,
        min_fee: UNIT / 1000u64,
        max_fee: UNIT / 100u64,
        protocol_fee: UNIT * 3u64 / 1000u64,
        treasury: OPERATOR,
    };
    let mut d = Derivative::new(
        DERIVATIVE,
        params,
        collateral.clone(),
        ManualReference::new(UNIT * 2_000u64),
        clock.clone(),
    );
    d.init(
        OPERATOR,
        &InitArgs {
            batch_name: "prop".to_string(),
            duration_secs: 7 * 86_400,
            initial_a: UNIT * 100u64,
            initial_b: UNIT * 100u64,
        },
    )
    .unwrap();
    (d, collateral, clock)
}

fn share(value: U256, pct: u64) -> U256 {
    value * pct / 100u64
}

fn apply(d: &mut Instance, clock: &ManualClock, op: &Op) -> derivative::Result<()> {
    let zero = U256::zero();
    let a = d.balance_of(TokenKind::A, &USER);
    let b = d.balance_of(TokenKind::B, &USER);
    let lp = d.balance_of(TokenKind::Lp, &USER);
    match *op {
        Op::Mint(n) => d.mint(USER, UNIT * n),
        Op::MintA(n) => d.mint_a(USER, UNIT * n, zero).map(drop),
        Op::MintB(n) => d.mint_b(USER, UNIT * n, zero).map(drop),
        Op::MintLp(n) => d.mint_lp(USER, UNIT * n, zero).map(drop),
        Op::Burn(p) => d.burn(USER, share(a.min(b), p)).map(drop),
        Op::BurnA(p) => d.burn_a(USER, share(a, p), zero).map(drop),
        Op::BurnB(p) => d.burn_b(USER, share(b, p), zero).map(drop),
        Op::BurnExactA(p) => d.burn_exact_a(USER, share(a, p) / 4u64, U256::MAX).map(drop),
        Op::BurnExactB(p) => d.burn_exact_b(USER, share(b, p) / 4u64, U256::MAX).map(drop),
        Op::BurnLp(p) => d.burn_lp(USER, share(lp, p), zero).map(drop),
        Op::SwapAToB(p) => d.swap_a_to_b(USER, share(a, p), zero).map(drop),
        Op::SwapBToA(p) => d.swap_b_to_a(USER, share(b, p), zero).map(drop),
        Op::Deposit(p) => d.deposit_lp(USER, share(a, p), share(b, p), zero).map(drop),
        Op::Withdraw(p) => {
            let (pool_a, pool_b) = (d.pool_a(), d.pool_b());
            d.withdraw_lp(USER, share(pool_a, p) / 4u64, share(pool_b, p) / 4u64, U256::MAX)
                .map(drop)
        }
        Op::Wait(secs) => {
            clock.advance(secs);
            Ok(())
        }
    }
}

fn backed(d: &Instance, collateral: &SharedCollateral) -> (U256, U256, U256) {
    let held = collateral.lock().balance_of(&DERIVATIVE);
    let a_total = d.total_supply(TokenKind::A) + d.pool_a();
    let b_total = d.total_supply(TokenKind::B) + d.pool_b();
    (held, a_total, b_total)
}

fn ledger_sums_match(d: &Instance) -> bool {
    [TokenKind::A, TokenKind::B, TokenKind::Lp].into_iter().all(|kind| {
        let token = d.token(kind).unwrap();
        let sum = token
            .holders()
            .fold(U256::zero(), |acc, (_, balance)| acc + *balance);
        sum == token.total_supply()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_collateral_backs_both_tranches(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let (mut d, collateral, clock) = instance();

        for op in &ops {
            let before = d.snapshot();
            if apply(&mut d, &clock, op).is_err() {
                prop_assert_eq!(d.snapshot(), before);
            }

            let (held, a_total, b_total) = backed(&d, &collateral);
            prop_assert_eq!(held, a_total);
            prop_assert_eq!(held, b_total);
            prop_assert!(ledger_sums_match(&d));
        }
    }

    #[test]
    fn prop_swaps_never_shrink_invariant(
        amounts in prop::collection::vec((any::<bool>(), 1u64..500), 1..20)
    ) {
        let (mut d, _collateral, _clock) = instance();
        d.mint(USER, UNIT * 10_000u64).unwrap();

        for (a_to_b, units) in amounts {
            let k_before = d.pool().invariant();
            let amount = UNIT * units;
            if a_to_b {
                d.swap_a_to_b(USER, amount, U256::zero()).unwrap();
            } else {
                d.swap_b_to_a(USER, amount, U256::zero()).unwrap();
            }
            prop_assert!(d.pool().invariant() >= k_before);
        }
    }
}
