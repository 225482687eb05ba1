pub mod timeframe;
