use crate::application::market_data::{LoadedCandles, MarketDataProvider};
use crate::application::strategies::{Strategy, StrategyResolver};
use crate::domain::backtest::{
    BacktestConfig, BacktestResult, DataOrigin, EquityPoint, Provenance, RunSummary,
};
use crate::domain::errors::BacktestError;
use crate::domain::optimization::fitness;
use crate::domain::optimization::types::FitnessMetric;
use crate::domain::performance::metrics::{MetricsInput, PerformanceMetrics};
use crate::domain::performance::stats::Stats;
use crate::domain::ports::ResultSink;
use crate::domain::risk::risk_policy::{GateContext, RiskGate, ValidationResult};
use crate::domain::trading::types::{BacktestTrade, Candle, TradeSignal};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Candles for every symbol of a run, loaded once and reusable across runs
/// that share symbols and date range.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketDataSet {
    pub series: BTreeMap<String, LoadedCandles>,
    pub benchmark: Option<Vec<Candle>>,
}

impl MarketDataSet {
    pub fn origins(&self) -> BTreeMap<String, DataOrigin> {
        self.series
            .iter()
            .map(|(symbol, loaded)| (symbol.clone(), loaded.origin))
            .collect()
    }

    pub fn bar_count(&self) -> usize {
        self.series.values().map(|l| l.candles.len()).sum()
    }
}

/// Running account state during a simulation
struct Account {
    capital: Decimal,
    peak: Decimal,
    max_drawdown: f64,
    daily_pnl: Decimal,
}

impl Account {
    fn new(initial: Decimal) -> Self {
        Self {
            capital: initial,
            peak: initial,
            max_drawdown: 0.0,
            daily_pnl: Decimal::ZERO,
        }
    }

    fn drawdown(&self) -> f64 {
        if self.peak <= Decimal::ZERO {
            return 0.0;
        }
        ((self.peak - self.capital) / self.peak)
            .to_f64()
            .unwrap_or(0.0)
            .max(0.0)
    }

    fn apply(&mut self, pnl: Decimal) {
        self.capital += pnl;
        self.daily_pnl += pnl;
        if self.capital > self.peak {
            self.peak = self.capital;
        }
        self.max_drawdown = self.max_drawdown.max(self.drawdown());
    }
}

/// Chronological trade simulator with risk gating.
#[derive(Clone)]
pub struct Simulator {
    market_data: MarketDataProvider,
    resolver: StrategyResolver,
    result_sink: Option<Arc<dyn ResultSink>>,
}

impl Simulator {
    pub fn new(
        market_data: MarketDataProvider,
        resolver: StrategyResolver,
        result_sink: Option<Arc<dyn ResultSink>>,
    ) -> Self {
        Self {
            market_data,
            resolver,
            result_sink,
        }
    }

    pub fn resolver(&self) -> &StrategyResolver {
        &self.resolver
    }

    /// Loads and persists a standalone backtest.
    pub async fn run(&self, config: &BacktestConfig) -> Result<BacktestResult, BacktestError> {
        config.validate()?;
        let data = Arc::new(self.load_market_data(config).await);
        let result = self.run_with_data(config, &data).await?;
        self.record(&result, fitness::score(&result, FitnessMetric::Custom))
            .await;
        Ok(result)
    }

    pub async fn load_market_data(&self, config: &BacktestConfig) -> MarketDataSet {
        let mut series = BTreeMap::new();
        for symbol in &config.symbols {
            let loaded = self
                .market_data
                .load(
                    symbol,
                    config.timeframe,
                    config.start_date,
                    config.end_date,
                    config.seed,
                )
                .await;
            series.insert(symbol.clone(), loaded);
        }

        let benchmark = match &config.benchmark {
            Some(symbol) => {
                let loaded = self
                    .market_data
                    .load(
                        symbol,
                        config.timeframe,
                        config.start_date,
                        config.end_date,
                        config.seed,
                    )
                    .await;
                if loaded.origin == DataOrigin::Synthetic {
                    warn!("Simulator: benchmark {} is synthetic, alpha/beta are not meaningful", symbol);
                }
                Some(loaded.candles)
            }
            None => None,
        };

        MarketDataSet { series, benchmark }
    }

    /// Simulates against preloaded data. Does not touch the result sink.
    ///
    /// The bar replay runs on the blocking pool, so concurrent calls use
    /// separate threads.
    pub async fn run_with_data(
        &self,
        config: &BacktestConfig,
        data: &Arc<MarketDataSet>,
    ) -> Result<BacktestResult, BacktestError> {
        config.validate()?;

        let mut strategy = self
            .resolver
            .resolve(&config.strategy_id, &config.parameters, config.seed)
            .await?;
        let tier = strategy.tier();

        strategy.initialize()?;
        let replay_config = config.clone();
        let replay_data = Arc::clone(data);
        let outcome = tokio::task::spawn_blocking(move || {
            let outcome = simulate(&replay_config, &mut strategy, &replay_data);
            strategy.cleanup();
            outcome
        })
        .await
        .map_err(|e| BacktestError::SimulationAborted(e.to_string()))?;

        let benchmark_returns = data
            .benchmark
            .as_deref()
            .map(|bars| aligned_benchmark_returns(bars, &outcome.equity_curve));

        let metrics = PerformanceMetrics::calculate(MetricsInput {
            trades: &outcome.trades,
            equity_curve: &outcome.equity_curve,
            initial_capital: config.initial_capital,
            final_capital: outcome.final_capital,
            max_drawdown: outcome.max_drawdown,
            period_days: config.period_days(),
            benchmark_returns: benchmark_returns.as_deref(),
        });

        debug!(
            "Simulator: {} {} finished with {} trades, return {:.2}%",
            config.strategy_id,
            config.parameters,
            metrics.total_trades,
            metrics.total_return * 100.0
        );

        Ok(BacktestResult {
            config: config.clone(),
            final_capital: outcome.final_capital,
            total_return: metrics.total_return,
            annualized_return: metrics.annualized_return,
            max_drawdown: metrics.max_drawdown,
            win_rate: metrics.win_rate,
            total_trades: metrics.total_trades,
            winning_trades: metrics.winning_trades,
            losing_trades: metrics.losing_trades,
            average_win: metrics.average_win,
            average_loss: metrics.average_loss,
            profit_factor: metrics.profit_factor,
            trades: outcome.trades,
            equity_curve: outcome.equity_curve,
            monthly_returns: metrics.monthly_returns,
            risk_metrics: metrics.risk,
            provenance: Provenance {
                strategy_tier: tier,
                data: data.origins(),
            },
        })
    }

    /// Appends a run summary. Failures are logged, never returned.
    pub async fn record(&self, result: &BacktestResult, fitness_score: f64) {
        let Some(sink) = &self.result_sink else {
            return;
        };

        let summary = RunSummary::from_result(result, fitness_score, Utc::now().date_naive());
        match sink.append(&summary).await {
            Ok(()) => info!(
                "Simulator: recorded summary for {} ({} trades)",
                summary.strategy_id, summary.trade_count
            ),
            Err(e) => warn!(
                "Simulator: failed to persist summary for {}: {:#}",
                summary.strategy_id, e
            ),
        }
    }
}

struct SimulationOutcome {
    trades: Vec<BacktestTrade>,
    equity_curve: Vec<EquityPoint>,
    final_capital: Decimal,
    max_drawdown: f64,
}

/// Replays every bar of every symbol in timestamp order against one account.
fn simulate(
    config: &BacktestConfig,
    strategy: &mut dyn Strategy,
    data: &MarketDataSet,
) -> SimulationOutcome {
    let gate = RiskGate::new(config.risk);
    let position_size = gate.effective_position_size(config.position_size);

    let mut bars: Vec<&Candle> = data.series.values().flat_map(|l| l.candles.iter()).collect();
    bars.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });

    let mut account = Account::new(config.initial_capital);
    let mut trades: Vec<BacktestTrade> = Vec::new();
    let mut equity_curve: Vec<EquityPoint> = Vec::new();
    let mut current_day: Option<NaiveDate> = None;

    for bar in bars {
        let day = bar.timestamp.date_naive();
        if current_day != Some(day) {
            if let Some(previous) = current_day {
                equity_curve.push(equity_point(previous, &account, trades.len()));
            }
            current_day = Some(day);
            account.daily_pnl = Decimal::ZERO;
        }

        let Some(signal) = strategy.on_candle(bar) else {
            continue;
        };

        let ctx = GateContext {
            capital: account.capital,
            daily_pnl: account.daily_pnl,
            position_size,
        };
        if let ValidationResult::Reject(reason) = gate.validate(&signal, &ctx) {
            debug!("Simulator: {} signal rejected: {}", bar.symbol, reason);
            continue;
        }

        let trade = execute(
            config,
            bar,
            &signal,
            position_size,
            account.capital,
            trades.len(),
        );
        if let Some(trade) = trade {
            account.apply(trade.pnl);
            trades.push(trade);
        }
    }

    if let Some(last) = current_day {
        equity_curve.push(equity_point(last, &account, trades.len()));
    }

    SimulationOutcome {
        trades,
        equity_curve,
        final_capital: account.capital,
        max_drawdown: account.max_drawdown,
    }
}

/// Sizes and closes one trade at the take-profit offset. None when the
/// position cannot be afforded.
fn execute(
    config: &BacktestConfig,
    bar: &Candle,
    signal: &TradeSignal,
    position_size: Decimal,
    capital: Decimal,
    sequence: usize,
) -> Option<BacktestTrade> {
    let entry_price = bar.close;
    if entry_price <= Decimal::ZERO {
        return None;
    }

    let mut quantity = (position_size / entry_price).floor().to_u64().unwrap_or(0);
    if let Some(requested) = signal.quantity {
        quantity = quantity.min(requested);
    }
    if quantity == 0 {
        return None;
    }

    let fees = config.fee_model();
    let entry_cost = fees.calculate_cost(quantity, entry_price);
    let notional = entry_price * Decimal::from(quantity);
    if notional + entry_cost.total_impact > capital {
        debug!(
            "Simulator: {} x{} at {} exceeds capital {}",
            bar.symbol,
            quantity,
            entry_price,
            capital.round_dp(2)
        );
        return None;
    }

    let sign = signal.direction.sign();
    let exit_price = signal
        .take_profit
        .unwrap_or(entry_price * (Decimal::ONE + sign * config.risk.take_profit_pct))
        .max(Decimal::ZERO);
    let exit_cost = fees.calculate_cost(quantity, exit_price);

    let gross = sign * (exit_price - entry_price) * Decimal::from(quantity);
    let pnl = gross - entry_cost.total_impact - exit_cost.total_impact;
    let pnl_pct = (pnl / notional).to_f64().unwrap_or(0.0);

    let exit_date = bar.timestamp + config.timeframe.duration();

    Some(BacktestTrade {
        id: format!("{}-{}-{}", bar.symbol, bar.timestamp.timestamp(), sequence + 1),
        symbol: bar.symbol.clone(),
        side: signal.direction,
        entry_date: bar.timestamp,
        exit_date,
        entry_price,
        exit_price,
        quantity,
        pnl,
        pnl_pct,
        holding_secs: (exit_date - bar.timestamp).num_seconds(),
    })
}

fn equity_point(date: NaiveDate, account: &Account, trade_count: usize) -> EquityPoint {
    EquityPoint {
        date,
        equity: account.capital,
        drawdown: account.drawdown(),
        trade_count,
    }
}

/// Benchmark returns over the same date pairs as the equity curve. Each
/// equity date takes the last benchmark close on or before it.
fn aligned_benchmark_returns(bars: &[Candle], equity_curve: &[EquityPoint]) -> Vec<f64> {
    let closes: BTreeMap<NaiveDate, Decimal> = bars
        .iter()
        .map(|c| (c.timestamp.date_naive(), c.close))
        .collect();
    let Some(first_close) = closes.values().next().copied() else {
        return Vec::new();
    };

    let aligned: Vec<Decimal> = equity_curve
        .iter()
        .map(|point| {
            closes
                .range(..=point.date)
                .next_back()
                .map(|(_, close)| *close)
                .unwrap_or(first_close)
        })
        .collect();

    Stats::calculate_returns(&aligned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::strategies::StrategyRegistry;
    use crate::domain::backtest::ResolutionTier;
    use crate::domain::trading::types::Direction;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn simulator() -> Simulator {
        Simulator::new(
            MarketDataProvider::synthetic_only(),
            StrategyResolver::new(Arc::new(StrategyRegistry::with_builtins()), None),
            None,
        )
    }

    fn config(strategy: &str) -> BacktestConfig {
        let mut config = BacktestConfig::new(
            strategy,
            vec!["TEST".to_string()],
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        );
        config.commission_pct = Decimal::ZERO;
        config.slippage_pct = Decimal::ZERO;
        config.seed = Some(42);
        config
    }

    fn flat_bars(symbol: &str, days: i64, close: Decimal) -> Vec<Candle> {
        (0..days)
            .map(|i| Candle {
                symbol: symbol.to_string(),
                interval: "1Day".to_string(),
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(i),
                open: close,
                high: close,
                low: close,
                close,
                volume: dec!(1000),
            })
            .collect()
    }

    fn data(series: Vec<(&str, Vec<Candle>)>) -> Arc<MarketDataSet> {
        Arc::new(MarketDataSet {
            series: series
                .into_iter()
                .map(|(symbol, candles)| {
                    (
                        symbol.to_string(),
                        LoadedCandles {
                            candles,
                            origin: DataOrigin::Live,
                        },
                    )
                })
                .collect(),
            benchmark: None,
        })
    }

    #[tokio::test]
    async fn test_always_buy_takes_profit_each_bar() {
        let cfg = config("always_buy");
        let data = data(vec![("TEST", flat_bars("TEST", 10, dec!(100)))]);

        let result = simulator().run_with_data(&cfg, &data).await.unwrap();

        // 10000 / 100 = 100 shares, +4% exit = +400 per trade
        assert_eq!(result.total_trades, 10);
        assert!(result.trades.iter().all(|t| t.quantity == 100));
        assert!(result.trades.iter().all(|t| t.pnl == dec!(400)));
        assert_eq!(result.final_capital, dec!(104000));
        // Ten simulated days, annualized over ten days
        let expected = 1.04f64.powf(365.0 / 10.0) - 1.0;
        assert!((result.annualized_return - expected).abs() < 1e-9);
        assert_eq!(result.win_rate, 1.0);
        assert_eq!(result.equity_curve.len(), 10);
        assert_eq!(result.provenance.strategy_tier, ResolutionTier::Registered);
        assert!(!result.provenance.is_degraded());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_runs_share_loaded_data() {
        let sim = simulator();
        let data = data(vec![("TEST", flat_bars("TEST", 10, dec!(100)))]);
        let cfg = config("always_buy");

        let (a, b) = tokio::join!(sim.run_with_data(&cfg, &data), sim.run_with_data(&cfg, &data));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a, b);
        assert_eq!(a.total_trades, 10);
        assert_eq!(Arc::strong_count(&data), 1);
    }

    #[tokio::test]
    async fn test_costs_are_charged_on_both_sides() {
        let mut cfg = config("always_buy");
        cfg.commission_pct = dec!(0.001);
        cfg.slippage_pct = dec!(0.0005);
        let data = data(vec![("TEST", flat_bars("TEST", 1, dec!(100)))]);

        let result = simulator().run_with_data(&cfg, &data).await.unwrap();
        let trade = &result.trades[0];

        // entry 10000 * 0.0015 = 15, exit 10400 * 0.0015 = 15.6
        assert_eq!(trade.pnl, dec!(400) - dec!(15) - dec!(15.6));
        assert_eq!(trade.exit_price, dec!(104));
        assert_eq!(trade.holding_secs, 86_400);
    }

    #[tokio::test]
    async fn test_position_size_is_capped_by_policy() {
        let mut cfg = config("always_buy");
        cfg.risk.max_position_size = dec!(2500);
        let data = data(vec![("TEST", flat_bars("TEST", 1, dec!(100)))]);

        let result = simulator().run_with_data(&cfg, &data).await.unwrap();
        assert_eq!(result.trades[0].quantity, 25);
    }

    #[tokio::test]
    async fn test_unaffordable_trades_are_skipped() {
        let mut cfg = config("always_buy");
        cfg.initial_capital = dec!(5000);
        let data = data(vec![("TEST", flat_bars("TEST", 3, dec!(100)))]);

        let result = simulator().run_with_data(&cfg, &data).await.unwrap();
        // Gate rejects position 10000 > capital 5000
        assert_eq!(result.total_trades, 0);
        assert_eq!(result.final_capital, dec!(5000));
    }

    #[test]
    fn test_short_exit_offset_is_mirrored() {
        let cfg = config("always_buy");
        let bar = &flat_bars("TEST", 1, dec!(50))[0];
        let signal = TradeSignal::new(bar, "x", Direction::Short, 0.9);

        let trade = execute(&cfg, bar, &signal, dec!(10000), dec!(100000), 0).unwrap();
        assert_eq!(trade.exit_price, dec!(48));
        assert_eq!(trade.pnl, dec!(400));
        assert_eq!(trade.quantity, 200);
    }

    #[tokio::test]
    async fn test_multi_symbol_merge_shares_capital() {
        let mut cfg = config("always_buy");
        cfg.symbols = vec!["AAA".to_string(), "BBB".to_string()];
        let data = data(vec![
            ("AAA", flat_bars("AAA", 3, dec!(100))),
            ("BBB", flat_bars("BBB", 3, dec!(200))),
        ]);

        let result = simulator().run_with_data(&cfg, &data).await.unwrap();

        assert_eq!(result.total_trades, 6);
        // One equity point per calendar day, not per symbol
        assert_eq!(result.equity_curve.len(), 3);
        assert_eq!(result.equity_curve[0].trade_count, 2);
        assert_eq!(result.trades[0].symbol, "AAA");
        assert_eq!(result.trades[1].symbol, "BBB");
        assert!(
            result
                .trades
                .windows(2)
                .all(|w| w[0].entry_date <= w[1].entry_date)
        );
    }

    #[tokio::test]
    async fn test_empty_candles_yield_zero_metrics() {
        let cfg = config("always_buy");
        let data = data(vec![("TEST", vec![])]);

        let result = simulator().run_with_data(&cfg, &data).await.unwrap();

        assert_eq!(result.total_trades, 0);
        assert_eq!(result.win_rate, 0.0);
        assert_eq!(result.risk_metrics.sharpe_ratio, 0.0);
        assert!(result.equity_curve.is_empty());
        assert_eq!(result.final_capital, cfg.initial_capital);
    }

    #[tokio::test]
    async fn test_daily_loss_limit_blocks_rest_of_day() {
        let mut cfg = config("always_buy");
        // Force losses: the exit offset is negative for longs
        cfg.risk.take_profit_pct = dec!(-0.2);
        cfg.risk.max_daily_loss = dec!(1000);

        // Two bars on the same day
        let mut bars = flat_bars("TEST", 1, dec!(100));
        let mut second = bars[0].clone();
        second.timestamp += Duration::hours(6);
        bars.push(second);
        let mut third = bars[0].clone();
        third.timestamp += Duration::hours(12);
        bars.push(third);
        let data = data(vec![("TEST", bars)]);

        let result = simulator().run_with_data(&cfg, &data).await.unwrap();
        // The first trade loses 2000, which blocks the rest of the day
        assert_eq!(result.total_trades, 1);
        assert!(result.max_drawdown > 0.0);
        assert!(result.equity_curve.iter().all(|p| p.drawdown >= 0.0));
    }

    #[tokio::test]
    async fn test_invalid_config_is_fatal() {
        let mut cfg = config("always_buy");
        cfg.end_date = cfg.start_date;
        let result = simulator().run(&cfg).await;
        assert!(matches!(result, Err(BacktestError::InvalidDateRange { .. })));
    }

    #[test]
    fn test_benchmark_alignment_forward_fills() {
        let bench = flat_bars("SPY", 2, dec!(100));
        let curve: Vec<EquityPoint> = (1..=3)
            .map(|d| EquityPoint {
                date: NaiveDate::from_ymd_opt(2024, 1, d).unwrap(),
                equity: dec!(100),
                drawdown: 0.0,
                trade_count: 0,
            })
            .collect();

        let returns = aligned_benchmark_returns(&bench, &curve);
        assert_eq!(returns, vec![0.0, 0.0]);
    }
}
