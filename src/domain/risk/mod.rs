pub mod risk_policy;
