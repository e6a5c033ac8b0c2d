use super::Package;

/// Criteria applied to fetched packages. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageFilter {
    /// Case-insensitive substring of the destination or package name.
    pub destination: Option<String>,
    /// Exact number of days.
    pub days: Option<u32>,
    /// Upper bound on the starting price. Packages without a price never match.
    pub max_price: Option<f64>,
}

impl PackageFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn with_days(mut self, days: u32) -> Self {
        self.days = Some(days);
        self
    }

    pub fn with_max_price(mut self, max_price: f64) -> Self {
        self.max_price = Some(max_price);
        self
    }

    /// Destination trimmed, or `None` when blank.
    pub fn search_term(&self) -> Option<&str> {
        self.destination
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }

    pub fn matches(&self, package: &Package) -> bool {
        if let Some(term) = self.search_term() {
            let term = term.to_lowercase();
            let hit = [package.destination_name(), package.package_name()]
                .into_iter()
                .flatten()
                .any(|name| name.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }

        if !self.days.map_or(true, |days| package.no_of_days() == Some(days)) {
            return false;
        }

        self.max_price
            .map_or(true, |max| package.price().map_or(false, |price| price <= max))
    }

    pub fn apply(&self, packages: Vec<Package>) -> Vec<Package> {
        packages.into_iter().filter(|p| self.matches(p)).collect()
    }
}
