use crate::cli::{CompareArgs, OrganizationArgs, SubjectArgs};
use crate::infra::InMemoryResponseStore;
use multirater::analytics::export::{flatten_organization, flatten_subject, write_csv};
use multirater::analytics::{
    AnalyticsEngine, AnalyticsService, Diagnostic, QuestionId, SubjectId,
};
use multirater::error::AppError;
use serde::Serialize;
use std::io::{self, Write};
use std::sync::Arc;

pub(crate) fn run_subject(engine: AnalyticsEngine, args: SubjectArgs) -> Result<(), AppError> {
    let store = Arc::new(InMemoryResponseStore::load(
        &args.input.definition,
        &args.input.responses,
        args.assignments.as_deref(),
    )?);
    let scope = store.scope(&args.input.organization);
    let service = AnalyticsService::new(Arc::clone(&store), Arc::new(engine));

    let view = match args.subject {
        Some(subject) => service.subject(&scope, &SubjectId::new(subject))?,
        // Without a subject the whole file is one subject's responses.
        None => {
            let report = service
                .engine()
                .subject_report(store.assessment(), store.rows());
            Arc::new(service.engine().guard().subject_view(&report, store.assessment()))
        }
    };

    report_diagnostics(&view.diagnostics);
    if args.csv {
        write_csv(&flatten_subject(&view), io::stdout().lock())?;
        Ok(())
    } else {
        print_json(&*view)
    }
}

pub(crate) fn run_organization(
    engine: AnalyticsEngine,
    args: OrganizationArgs,
) -> Result<(), AppError> {
    let store = Arc::new(InMemoryResponseStore::load(
        &args.input.definition,
        &args.input.responses,
        args.assignments.as_deref(),
    )?);
    let scope = store.scope(&args.input.organization);
    let service = AnalyticsService::new(store, Arc::new(engine));

    let view = service.organization(&scope)?;
    report_diagnostics(&view.diagnostics);
    if args.csv {
        write_csv(&flatten_organization(&view), io::stdout().lock())?;
        Ok(())
    } else {
        print_json(&*view)
    }
}

pub(crate) fn run_compare(engine: AnalyticsEngine, args: CompareArgs) -> Result<(), AppError> {
    let store = Arc::new(InMemoryResponseStore::load(
        &args.input.definition,
        &args.input.responses,
        None,
    )?);
    let scope = store.scope(&args.input.organization);
    let service = AnalyticsService::new(store, Arc::new(engine));

    let questions: Vec<QuestionId> = args.questions.into_iter().map(QuestionId::new).collect();
    let view = service.compare(&scope, &questions)?;

    report_diagnostics(&view.diagnostics);
    for unknown in &view.unknown_questions {
        eprintln!("warning: question {unknown} is not part of the assessment");
    }
    print_json(&*view)
}

fn report_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        eprintln!(
            "warning: row {} ({}/{}): {} - {}",
            diagnostic.row + 1,
            diagnostic.assignment_id,
            diagnostic.question_id,
            diagnostic.reason.label(),
            diagnostic.detail
        );
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
