use chrono::{DateTime, NaiveDateTime, Utc};

/// Source de temps injectée dans le contexte (jamais `Utc::now()` direct
/// dans les services, pour pouvoir tester les expirations).
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Heure UTC sans fuseau, format des colonnes `DateTime` de SeaORM
    fn naive_now(&self) -> NaiveDateTime {
        self.now().naive_utc()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Horloge manuelle pour les tests
#[cfg(test)]
#[derive(Debug)]
pub struct ManualClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Mutex::new(start),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
