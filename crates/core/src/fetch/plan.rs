//! Static source plan per statement kind.

use crate::sources::SourceId;
use crate::statement::StatementKind;

/// Which sources a statement needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePlan {
    /// The authoritative source. Its failure aborts the build.
    pub canonical: SourceId,
    /// Optional sources that annotate or cross-check.
    pub enrichment: &'static [SourceId],
}

const INCOME_ENRICHMENT: &[SourceId] = &[
    SourceId::Payments,
    SourceId::Payroll,
    SourceId::Card,
    SourceId::Crm,
    SourceId::Spreadsheet,
];

const BALANCE_ENRICHMENT: &[SourceId] = &[
    SourceId::Bank,
    SourceId::Payments,
    SourceId::Card,
    SourceId::Spreadsheet,
];

const CASH_FLOW_ENRICHMENT: &[SourceId] = &[SourceId::Bank, SourceId::Payments, SourceId::Payroll];

impl SourcePlan {
    /// The plan for `kind`.
    #[must_use]
    pub const fn for_statement(kind: StatementKind) -> Self {
        let enrichment = match kind {
            StatementKind::Income => INCOME_ENRICHMENT,
            StatementKind::Balance => BALANCE_ENRICHMENT,
            StatementKind::CashFlow => CASH_FLOW_ENRICHMENT,
        };
        Self {
            canonical: SourceId::Ledger,
            enrichment,
        }
    }

    /// Every source in the plan, canonical first.
    pub fn sources(&self) -> impl Iterator<Item = SourceId> + '_ {
        std::iter::once(self.canonical).chain(self.enrichment.iter().copied())
    }
}
