use super::InMemoryStore;
use crate::domain::models::{Employee, UserRole};
use anyhow::Result;
use chrono::NaiveDate;
use sqlx::PgPool;

struct SeedEmployee<'a> {
    email: &'a str,
    name: &'a str,
    department: &'a str,
    level: &'a str,
    position: &'a str,
    join_date: (i32, u32, u32),
    role: UserRole,
}

const ROSTER: &[SeedEmployee<'static>] = &[
    SeedEmployee {
        email: "admin@company.com",
        name: "HR Manager",
        department: "HR",
        level: "L5",
        position: "Lead",
        join_date: (2020, 1, 1),
        role: UserRole::Admin,
    },
    SeedEmployee {
        email: "dev1@company.com",
        name: "Developer One",
        department: "Engineering",
        level: "L2",
        position: "SE",
        join_date: (2022, 5, 15),
        role: UserRole::Member,
    },
    SeedEmployee {
        email: "dev2@company.com",
        name: "Developer Two",
        department: "Engineering",
        level: "L3",
        position: "Senior SE",
        join_date: (2021, 3, 10),
        role: UserRole::Member,
    },
    SeedEmployee {
        email: "sale1@company.com",
        name: "Sales rep",
        department: "Sales",
        level: "L1",
        position: "Associate",
        join_date: (2023, 11, 20),
        role: UserRole::Member,
    },
];

/// The demo roster the service starts with.
pub fn demo_employees() -> Vec<Employee> {
    ROSTER
        .iter()
        .filter_map(|s| {
            let (y, m, d) = s.join_date;
            let join_date = NaiveDate::from_ymd_opt(y, m, d)?;
            Some(Employee {
                email: s.email.to_string(),
                name: s.name.to_string(),
                department: s.department.to_string(),
                level: s.level.to_string(),
                position: s.position.to_string(),
                join_date,
                role: s.role,
            })
        })
        .collect()
}

pub fn seed_memory() -> InMemoryStore {
    let employees = demo_employees();
    tracing::info!("Seeded {} employees into in-memory store", employees.len());
    InMemoryStore::with_employees(employees)
}

pub async fn seed_postgres(pool: &PgPool) -> Result<()> {
    let mut inserted = 0u64;
    for employee in demo_employees() {
        let result = sqlx::query(
            r#"
            INSERT INTO employees (email, name, department, level, position, join_date, role)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(&employee.email)
        .bind(&employee.name)
        .bind(&employee.department)
        .bind(&employee.level)
        .bind(&employee.position)
        .bind(employee.join_date)
        .bind(employee.role)
        .execute(pool)
        .await?;
        inserted += result.rows_affected();
    }
    tracing::info!("Seeded employees: {} new", inserted);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_roster_has_one_admin() {
        let employees = demo_employees();
        assert_eq!(employees.len(), 4);
        let admins: Vec<_> = employees.iter().filter(|e| e.is_admin()).collect();
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].email, "admin@company.com");
    }

    #[tokio::test]
    async fn test_seed_memory_loads_roster() {
        use crate::db::SurveyStore;

        let store = seed_memory();
        assert_eq!(store.list_employees().await.unwrap().len(), ROSTER.len());
        let admin = store.find_employee_by_email("ADMIN@company.com").await.unwrap();
        assert!(admin.is_some_and(|e| e.is_admin()));
    }
}
