use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use dhv_pricer::{
    AssetId, DeltaBorrowRates, Fixed18, InMemoryExposureLedger, OptionSeries, Pricer,
    PricerConfig, PricerConfigBuilder, ProportionalMarginCalculator, QuoteRequest,
    StaticPriceFeed, TenorGrid,
};

const NOW: u64 = 1_700_000_000;
const EXPIRY: u64 = NOW + 30 * 86_400;

fn config() -> PricerConfig {
    let grid = TenorGrid::uniform(Fixed18::from_int(10), 5, Fixed18::from_int(2800), Fixed18::ONE)
        .expect("benchmark grid should be valid");
    PricerConfigBuilder::new()
        .tenor_grid(grid)
        .sabr_parameters(
            EXPIRY,
            "0.25,1,-0.3,1.5,0.3,1,-0.4,1.6,-0.001"
                .parse()
                .expect("benchmark SABR params should be valid"),
        )
        .slippage_gradient("0.0001".parse().expect("valid decimal"))
        .collateral_lending_rate("0.05".parse().expect("valid decimal"))
        .delta_borrow_rates(DeltaBorrowRates {
            sell_long: "0.01".parse().expect("valid decimal"),
            sell_short: "0.02".parse().expect("valid decimal"),
            buy_long: "0.03".parse().expect("valid decimal"),
            buy_short: "0.04".parse().expect("valid decimal"),
        })
        .build()
        .expect("benchmark config should be valid")
}

fn series(strike: i64, is_put: bool) -> OptionSeries {
    OptionSeries {
        expiration: EXPIRY,
        strike: Fixed18::from_int(strike),
        is_put,
        underlying: AssetId::new("WETH"),
        strike_asset: AssetId::new("USDC"),
        collateral: AssetId::new("USDC"),
    }
}

fn quote_benchmarks(c: &mut Criterion) {
    let config = config();
    let feed = StaticPriceFeed::new()
        .with_rate(AssetId::new("WETH"), AssetId::new("USDC"), Fixed18::from_int(2600))
        .expect("benchmark spot should be valid");
    let ledger = InMemoryExposureLedger::new();
    let margin = ProportionalMarginCalculator::fully_collateralised();
    let pricer = Pricer::new(&config, &feed, &ledger, &margin);

    let mut group = c.benchmark_group("quote");

    let atm = series(2600, false);
    group.bench_function("single_purchase", |b| {
        b.iter(|| {
            pricer.quote_option_price(
                black_box(&atm),
                black_box(Fixed18::from_int(10)),
                false,
                None,
                NOW,
            )
        })
    });

    let wing = series(3000, false);
    group.bench_function("low_delta_sale", |b| {
        b.iter(|| {
            pricer.quote_option_price(
                black_box(&wing),
                black_box(Fixed18::from_int(10)),
                true,
                None,
                NOW,
            )
        })
    });

    // 21 strikes × call/put
    let chain: Vec<QuoteRequest> = (0..21)
        .flat_map(|i| {
            let strike = 2000 + 60 * i;
            [series(strike, false), series(strike, true)]
        })
        .map(|series| QuoteRequest {
            series,
            amount: Fixed18::from_int(5),
            is_sell: true,
            exposure_override: None,
        })
        .collect();
    group.bench_function("chain_42", |b| {
        b.iter(|| pricer.quote_batch(black_box(&chain), NOW))
    });

    group.finish();
}

criterion_group!(benches, quote_benchmarks);
criterion_main!(benches);
