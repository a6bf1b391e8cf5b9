use crate::config::ForexConfig;
use crate::core::clock::{self, Clock};
use crate::core::currency::{CurrencyCode, CurrencyPair};
use crate::core::error::{Result, SettlementError};
use crate::forex::rate::{ConversionRequest, ConversionResult, ForexRate, HedgeRequirement};
use crate::store::{Entity, Filter, Repository};
use chrono::{DateTime, Utc};
use log::{debug, info};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::sync::Arc;

const CURRENT: &str = "current";
const LOCKED: &str = "locked";

/// Publishes rates, takes rate locks and converts amounts.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use rust_decimal_macros::dec;
/// use trade_settlement::config::ForexConfig;
/// use trade_settlement::core::clock::SystemClock;
/// use trade_settlement::core::currency::CurrencyPair;
/// use trade_settlement::forex::{ConversionRequest, ForexRate, ForexRateManager};
/// use trade_settlement::store::InMemoryRepository;
///
/// let forex = ForexRateManager::new(
///     Arc::new(InMemoryRepository::<ForexRate>::new()),
///     Arc::new(SystemClock),
///     ForexConfig::default(),
/// );
/// let pair = CurrencyPair::from_codes("USD", "AED");
/// forex.publish_rate(pair, dec!(3.67), dec!(0), dec!(0), None).unwrap();
///
/// let result = forex.convert(&ConversionRequest::new("USD", "AED", dec!(1000))).unwrap();
/// assert_eq!(result.converted_amount, dec!(3670));
/// ```
#[derive(Debug, Clone)]
pub struct ForexRateManager {
    repo: Arc<dyn Repository<ForexRate>>,
    clock: Arc<dyn Clock>,
    config: ForexConfig,
}

impl ForexRateManager {
    pub fn new(
        repo: Arc<dyn Repository<ForexRate>>,
        clock: Arc<dyn Clock>,
        config: ForexConfig,
    ) -> Self {
        Self {
            repo,
            clock,
            config,
        }
    }

    /// Replace the current rate for `pair`.
    pub fn publish_rate(
        &self,
        pair: CurrencyPair,
        rate: Decimal,
        spread_percent: Decimal,
        commission_percent: Decimal,
        source: Option<&str>,
    ) -> Result<ForexRate> {
        validate_pair(&pair)?;
        if rate <= Decimal::ZERO {
            return Err(SettlementError::validation(format!(
                "rate for {} must be positive, got {}",
                pair, rate
            )));
        }
        if spread_percent < Decimal::ZERO || commission_percent < Decimal::ZERO {
            return Err(SettlementError::validation(
                "spread and commission must not be negative",
            ));
        }

        for mut previous in self.current_records(&pair)? {
            previous.active = false;
            self.repo.update(&previous)?;
        }

        let source = source.unwrap_or(&self.config.default_source);
        let record = ForexRate::current(
            pair,
            rate,
            spread_percent,
            commission_percent,
            source,
            self.clock.now(),
        );
        let stored = self.repo.insert(&record)?;
        info!("published {} = {} ({})", stored.pair, stored.rate, stored.source);
        Ok(stored)
    }

    /// Newest active rate for `pair`.
    pub fn get_current_rate(&self, pair: &CurrencyPair) -> Result<ForexRate> {
        self.current_records(pair)?
            .into_iter()
            .max_by_key(|r| r.created_at)
            .ok_or_else(|| SettlementError::not_found(ForexRate::KIND, pair))
    }

    /// Lock the current rate for `minutes` (config default when `None`).
    pub fn lock_rate(&self, pair: &CurrencyPair, minutes: Option<i64>) -> Result<ForexRate> {
        let minutes = minutes.unwrap_or(self.config.default_lock_minutes);
        if minutes <= 0 {
            return Err(SettlementError::validation(format!(
                "lock duration must be positive, got {} minutes",
                minutes
            )));
        }
        let current = self.get_current_rate(pair)?;
        let now = self.clock.now();
        let lock = current.lock(clock::after_minutes(now, minutes)?, now);
        let stored = self.repo.insert(&lock)?;
        info!(
            "locked {} at {} until {}",
            stored.pair,
            stored.effective_rate(),
            until_label(stored.locked_until)
        );
        Ok(stored)
    }

    /// Newest lock for `pair` that has not yet expired.
    ///
    /// A lock whose `locked_until` is at or before now is treated as absent,
    /// whether or not cleanup has deactivated it yet.
    pub fn get_locked_rate(&self, pair: &CurrencyPair) -> Result<Option<ForexRate>> {
        let now = self.clock.now();
        Ok(self
            .repo
            .query(&Filter::new().lookup_key(pair.to_string()))?
            .into_iter()
            .filter(|r| r.is_live_lock(now))
            .max_by_key(|r| r.created_at))
    }

    /// Convert an amount. The converted amount is exactly `amount * rate`.
    pub fn convert(&self, request: &ConversionRequest) -> Result<ConversionResult> {
        if request.amount < Decimal::ZERO {
            return Err(SettlementError::validation(format!(
                "amount must not be negative, got {}",
                request.amount
            )));
        }
        let pair = request.pair();
        validate_pair(&pair)?;
        let now = self.clock.now();

        if pair.is_identity() {
            return Ok(ConversionResult {
                from: request.from.clone(),
                to: request.to.clone(),
                amount: request.amount,
                converted_amount: request.amount,
                rate: Decimal::ONE,
                locked_rate: None,
                locked_until: None,
                converted_at: now,
            });
        }

        let record = if request.lock_rate {
            match self.get_locked_rate(&pair)? {
                Some(lock) => {
                    debug!("reusing lock {} for {}", lock.id, pair);
                    lock
                }
                None => self.lock_rate(&pair, request.lock_minutes)?,
            }
        } else {
            self.get_current_rate(&pair)?
        };

        let rate = record.effective_rate();
        let converted_amount = request
            .amount
            .checked_mul(rate)
            .ok_or_else(out_of_range)?;
        Ok(ConversionResult {
            from: request.from.clone(),
            to: request.to.clone(),
            amount: request.amount,
            converted_amount,
            rate,
            locked_rate: record.locked_rate,
            locked_until: record.locked_until,
            converted_at: now,
        })
    }

    /// Size a hedge covering `percentage` (default 100) of `exposure`.
    pub fn calculate_hedge_requirements(
        &self,
        exposure: Decimal,
        pair: &CurrencyPair,
        percentage: Option<Decimal>,
    ) -> Result<HedgeRequirement> {
        let hedge_percentage = percentage.unwrap_or(Decimal::ONE_HUNDRED);
        if exposure < Decimal::ZERO {
            return Err(SettlementError::validation("exposure must not be negative"));
        }
        if hedge_percentage < Decimal::ZERO || hedge_percentage > Decimal::ONE_HUNDRED {
            return Err(SettlementError::validation(format!(
                "hedge percentage must be within 0..=100, got {}",
                hedge_percentage
            )));
        }
        let current_rate = self.get_current_rate(pair)?.rate;
        let hedge_amount = exposure
            .checked_mul(hedge_percentage / Decimal::ONE_HUNDRED)
            .ok_or_else(out_of_range)?;
        let hedge_value = hedge_amount
            .checked_mul(current_rate)
            .ok_or_else(out_of_range)?;
        Ok(HedgeRequirement {
            pair: pair.clone(),
            exposure,
            hedge_percentage,
            hedge_amount,
            current_rate,
            hedge_value,
        })
    }

    /// Deactivate every expired lock. Returns how many were deactivated.
    pub fn cleanup_expired_locks(&self) -> Result<usize> {
        let now = self.clock.now();
        let expired: Vec<ForexRate> = self
            .repo
            .query(&Filter::new().status(LOCKED))?
            .into_iter()
            .filter(|r| !r.is_live_lock(now))
            .collect();

        let mut count = 0;
        for mut lock in expired {
            lock.active = false;
            match self.repo.update(&lock) {
                Ok(_) => count += 1,
                // Someone else released it first.
                Err(SettlementError::Conflict { .. }) => {
                    debug!("lock {} already updated, skipping", lock.id)
                }
                Err(e) => return Err(e),
            }
        }
        if count > 0 {
            info!("deactivated {} expired rate locks", count);
        }
        Ok(count)
    }

    /// Currencies appearing in any current rate, sorted.
    pub fn available_currencies(&self) -> Result<Vec<CurrencyCode>> {
        let currencies: BTreeSet<CurrencyCode> = self
            .repo
            .query(&Filter::new().status(CURRENT))?
            .into_iter()
            .flat_map(|r| [r.pair.base, r.pair.quote])
            .collect();
        Ok(currencies.into_iter().collect())
    }

    /// Published rates (current and superseded, not locks) created in range.
    pub fn historical_rates(
        &self,
        pair: &CurrencyPair,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<ForexRate>> {
        Ok(self
            .repo
            .query(
                &Filter::new()
                    .lookup_key(pair.to_string())
                    .created_between(from, to),
            )?
            .into_iter()
            .filter(|r| !r.is_lock())
            .collect())
    }

    fn current_records(&self, pair: &CurrencyPair) -> Result<Vec<ForexRate>> {
        self.repo.query(
            &Filter::new()
                .lookup_key(pair.to_string())
                .status(CURRENT),
        )
    }
}

fn validate_pair(pair: &CurrencyPair) -> Result<()> {
    if pair.base.is_empty() || pair.quote.is_empty() {
        return Err(SettlementError::validation("currency code is required"));
    }
    Ok(())
}

fn out_of_range() -> SettlementError {
    SettlementError::validation("amount out of range")
}

fn until_label(until: Option<DateTime<Utc>>) -> String {
    until.map(|u| u.to_rfc3339()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use chrono::Duration;
    use crate::store::InMemoryRepository;
    use rust_decimal_macros::dec;

    fn manager() -> (ForexRateManager, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let forex = ForexRateManager::new(
            Arc::new(InMemoryRepository::<ForexRate>::new()),
            clock.clone(),
            ForexConfig::default(),
        );
        (forex, clock)
    }

    fn usd_aed() -> CurrencyPair {
        CurrencyPair::from_codes("USD", "AED")
    }

    fn publish(forex: &ForexRateManager, rate: Decimal) -> ForexRate {
        forex
            .publish_rate(usd_aed(), rate, dec!(0.1), dec!(0.05), None)
            .unwrap()
    }

    #[test]
    fn test_publish_replaces_current() {
        let (forex, clock) = manager();
        let first = publish(&forex, dec!(3.67));
        clock.advance(Duration::minutes(1));
        let second = publish(&forex, dec!(3.68));

        let current = forex.get_current_rate(&usd_aed()).unwrap();
        assert_eq!(current.id, second.id);
        assert_eq!(current.rate, dec!(3.68));

        let history = forex.historical_rates(&usd_aed(), None, None).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, first.id);
        assert!(!history[0].active);
    }

    #[test]
    fn test_publish_rejects_non_positive() {
        let (forex, _) = manager();
        let err = forex
            .publish_rate(usd_aed(), Decimal::ZERO, dec!(0), dec!(0), None)
            .unwrap_err();
        assert!(matches!(err, SettlementError::Validation(_)));
    }

    #[test]
    fn test_missing_pair_not_found() {
        let (forex, _) = manager();
        let err = forex
            .get_current_rate(&CurrencyPair::from_codes("XXX", "YYY"))
            .unwrap_err();
        assert!(matches!(err, SettlementError::NotFound { .. }));
    }

    #[test]
    fn test_convert_exact() {
        let (forex, _) = manager();
        publish(&forex, dec!(3.67));
        let result = forex
            .convert(&ConversionRequest::new("USD", "AED", dec!(1000)))
            .unwrap();
        assert_eq!(result.converted_amount, dec!(3670));
        assert_eq!(result.rate, dec!(3.67));
        assert!(result.locked_rate.is_none());
    }

    #[test]
    fn test_convert_zero_and_negative() {
        let (forex, _) = manager();
        publish(&forex, dec!(3.67));
        let zero = forex
            .convert(&ConversionRequest::new("USD", "AED", Decimal::ZERO))
            .unwrap();
        assert_eq!(zero.converted_amount, Decimal::ZERO);

        let err = forex
            .convert(&ConversionRequest::new("USD", "AED", dec!(-1000)))
            .unwrap_err();
        assert!(matches!(err, SettlementError::Validation(_)));
    }

    #[test]
    fn test_identity_conversion_needs_no_rate() {
        let (forex, _) = manager();
        let result = forex
            .convert(&ConversionRequest::new("AED", "AED", dec!(250.50)).locked_for(60))
            .unwrap();
        assert_eq!(result.rate, Decimal::ONE);
        assert_eq!(result.converted_amount, dec!(250.50));
        assert!(forex.get_locked_rate(&usd_aed()).unwrap().is_none());
    }

    #[test]
    fn test_locked_conversion_reuses_live_lock() {
        let (forex, clock) = manager();
        publish(&forex, dec!(3.67));
        let request = ConversionRequest::new("USD", "AED", dec!(100)).locked_for(30);
        let first = forex.convert(&request).unwrap();
        assert_eq!(first.locked_rate, Some(dec!(3.67)));

        clock.advance(Duration::minutes(5));
        publish(&forex, dec!(3.70));
        let second = forex.convert(&request).unwrap();
        assert_eq!(second.rate, dec!(3.67));
        assert_eq!(second.locked_until, first.locked_until);
    }

    #[test]
    fn test_expired_lock_never_returned() {
        let (forex, clock) = manager();
        publish(&forex, dec!(3.67));
        let lock = forex.lock_rate(&usd_aed(), Some(30)).unwrap();
        assert_eq!(
            forex.get_locked_rate(&usd_aed()).unwrap().map(|l| l.id),
            Some(lock.id)
        );

        clock.advance(Duration::minutes(30));
        assert!(forex.get_locked_rate(&usd_aed()).unwrap().is_none());

        assert_eq!(forex.cleanup_expired_locks().unwrap(), 1);
        assert_eq!(forex.cleanup_expired_locks().unwrap(), 0);
    }

    #[test]
    fn test_lock_uses_default_duration() {
        let (forex, clock) = manager();
        publish(&forex, dec!(3.67));
        let lock = forex.lock_rate(&usd_aed(), None).unwrap();
        assert_eq!(lock.locked_until, Some(clock.now() + Duration::minutes(30)));
    }

    #[test]
    fn test_hedge_requirements() {
        let (forex, _) = manager();
        publish(&forex, dec!(3.67));
        let hedge = forex
            .calculate_hedge_requirements(dec!(10000), &usd_aed(), Some(dec!(50)))
            .unwrap();
        assert_eq!(hedge.hedge_amount, dec!(5000));
        assert_eq!(hedge.hedge_value, dec!(18350));

        let full = forex
            .calculate_hedge_requirements(dec!(10000), &usd_aed(), None)
            .unwrap();
        assert_eq!(full.hedge_amount, dec!(10000));

        assert!(forex
            .calculate_hedge_requirements(dec!(10000), &usd_aed(), Some(dec!(120)))
            .is_err());
    }

    #[test]
    fn test_overflowing_amounts_are_rejected() {
        let (forex, _) = manager();
        forex
            .publish_rate(usd_aed(), dec!(3.67), dec!(0), dec!(0), None)
            .unwrap();

        let err = forex
            .convert(&ConversionRequest::new("USD", "AED", Decimal::MAX))
            .unwrap_err();
        assert!(matches!(err, SettlementError::Validation(ref m) if m == "amount out of range"));

        let half = forex
            .calculate_hedge_requirements(Decimal::MAX, &usd_aed(), Some(dec!(50)));
        assert!(matches!(half, Err(SettlementError::Validation(_))));

        // Identity conversions never multiply.
        let same = forex
            .convert(&ConversionRequest::new("AED", "AED", Decimal::MAX))
            .unwrap();
        assert_eq!(same.converted_amount, Decimal::MAX);
    }

    #[test]
    fn test_lock_duration_out_of_range() {
        let (forex, _) = manager();
        publish(&forex, dec!(3.67));
        let err = forex.lock_rate(&usd_aed(), Some(i64::MAX / 60)).unwrap_err();
        assert!(matches!(err, SettlementError::Validation(_)));
        assert!(forex.get_locked_rate(&usd_aed()).unwrap().is_none());
    }

    #[test]
    fn test_available_currencies() {
        let (forex, _) = manager();
        publish(&forex, dec!(3.67));
        forex
            .publish_rate(CurrencyPair::from_codes("EUR", "USD"), dec!(1.08), dec!(0), dec!(0), None)
            .unwrap();
        let codes: Vec<String> = forex
            .available_currencies()
            .unwrap()
            .into_iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(codes, vec!["AED", "EUR", "USD"]);
    }
}
