/// An office of a tenant. Holidays and settings overrides can be scoped to one.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Branch {
    pub id: u64,
    pub tenant_id: u64,
    pub name: String,
}
