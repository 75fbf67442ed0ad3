use criterion::{Criterion, criterion_group, criterion_main};
use domain::validation::{integer, string};
use domain::{
    Command, DomainEvent, Entity, EntityTrait, EntityTraitOptions, InMemoryEventPublisher,
    NonEmptyStringMax100, ParseResult, Reduced, as_command, create_aggregate_trait, parse_struct,
};
use serde_json::{Value, json};

#[derive(Debug, Clone)]
struct Account {
    owner: NonEmptyStringMax100,
    currency: String,
    balance: i64,
}

fn account_props(raw: &Value) -> ParseResult<Account> {
    parse_struct(raw, |f| {
        let owner = f.required("owner", NonEmptyStringMax100::parse);
        let currency = f.required("currency", string);
        let balance = f.required("balance", integer);
        Some(Account {
            owner: owner?,
            currency: currency?,
            balance: balance?,
        })
    })
}

fn account_trait() -> EntityTrait<Account> {
    create_aggregate_trait(account_props, "Account", EntityTraitOptions::default())
}

fn deposit() -> Command<i64, Account> {
    as_command(|amount: i64, props: &Account, entity: &Entity<Account>| {
        Ok(Reduced::new(Account {
            balance: props.balance + amount,
            ..props.clone()
        })
        .with_event(DomainEvent::for_entity(
            "Deposited",
            entity,
            json!({"amount": amount}),
        )))
    })
}

fn bench_parse_entity(c: &mut Criterion) {
    let t = account_trait();
    let input = json!({"owner": "Ada Lovelace", "currency": "EUR", "balance": 100});

    c.bench_function("domain/parse_entity", |b| {
        b.iter(|| t.parse(&input).unwrap());
    });
}

fn bench_parse_entity_with_errors(c: &mut Criterion) {
    let t = account_trait();
    let input = json!({"owner": "", "currency": 1, "balance": "x"});

    c.bench_function("domain/parse_entity_three_errors", |b| {
        b.iter(|| t.parse(&input).unwrap_err());
    });
}

fn bench_apply_command(c: &mut Criterion) {
    let account = account_trait()
        .parse(&json!({"owner": "Ada", "currency": "EUR", "balance": 0}))
        .unwrap();
    let command = deposit();

    c.bench_function("domain/apply_command", |b| {
        b.iter(|| command.apply(10, account.clone()).unwrap());
    });
}

fn bench_apply_100_commands(c: &mut Criterion) {
    let account = account_trait()
        .parse(&json!({"owner": "Ada", "currency": "EUR", "balance": 0}))
        .unwrap();
    let command = deposit();

    c.bench_function("domain/apply_100_commands", |b| {
        b.iter(|| {
            let mut current = account.clone();
            for _ in 0..100 {
                current = command.apply(1, current).unwrap().entity;
            }
            current
        });
    });
}

fn bench_publish_outcome(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let account = account_trait()
        .parse(&json!({"owner": "Ada", "currency": "EUR", "balance": 0}))
        .unwrap();
    let command = deposit();

    c.bench_function("domain/apply_and_publish", |b| {
        b.iter(|| {
            rt.block_on(async {
                let publisher = InMemoryEventPublisher::new();
                let outcome = command.apply(5, account.clone()).unwrap();
                outcome.publish(&publisher).await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_parse_entity,
    bench_parse_entity_with_errors,
    bench_apply_command,
    bench_apply_100_commands,
    bench_publish_outcome,
);
criterion_main!(benches);
