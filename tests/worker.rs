use std::{
    io::{BufRead, BufReader, Write},
    path::PathBuf,
    process::{Command as Process, Stdio},
};

use anyhow::{anyhow, Context, Result};
use polyloc::{Command, Coords, Event, QueryId, WorkerConfig, WorkerHandle};
use serde_json::{json, Value};

fn gazetteer() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/wof")
}

fn load(name: &str) -> Command {
    Command::Load {
        name: name.to_owned(),
        directory: gazetteer(),
    }
}

fn search(id: QueryId, lon: f64, lat: f64) -> Command {
    Command::Search {
        id,
        coords: Coords { lat, lon },
    }
}

#[test]
fn results_are_correlated_with_queries() -> Result<()> {
    let worker = WorkerHandle::spawn(WorkerConfig::default())?;

    worker.send(search(QueryId::from(0), 1., 1.))?;
    worker.send(load("region"))?;
    worker.send(search(QueryId::from(1), 1., 1.))?;
    worker.send(search(QueryId::from("island"), 5., 5.))?;
    worker.send(search(QueryId::from(3), 22., 22.))?;
    worker.send(search(QueryId::from(4), 15., 15.))?;

    let events = worker.shutdown().map_err(|_| anyhow!("worker panicked"))?;

    let mut events = events.into_iter();
    assert_eq!(
        events.next(),
        Some(Event::NotReady {
            name: None,
            id: QueryId::from(0)
        })
    );
    assert_eq!(
        events.next(),
        Some(Event::Loaded {
            name: "region".to_owned()
        })
    );
    let results: Vec<_> = events
        .map(|event| match event {
            Event::Results { name, id, results } => {
                assert_eq!(name, "region");
                Ok((id, Value::Object(results)))
            }
            other => Err(anyhow!("unexpected event {other:?}")),
        })
        .collect::<Result<_>>()?;
    assert_eq!(
        results,
        vec![
            (
                QueryId::from(1),
                json!({
                    "Id": 85680001,
                    "Name": "Ringland",
                    "Placetype": "region",
                    "Hierarchy": [{ "region_id": 85680001 }],
                })
            ),
            (
                QueryId::from("island"),
                json!({
                    "Id": 85680002,
                    "Name": "Islet Region",
                    "Placetype": "region",
                    "Hierarchy": [{ "region_id": 85680002, "country_id": 85680001 }],
                })
            ),
            (
                QueryId::from(3),
                json!({
                    "Id": 85680003,
                    "Name": "Eastmark",
                    "Placetype": "region",
                    "Hierarchy": [{ "region_id": 85680003 }],
                })
            ),
            (QueryId::from(4), json!({})),
        ]
    );
    Ok(())
}

#[test]
fn worker_recovers_from_a_failed_load() -> Result<()> {
    let worker = WorkerHandle::spawn(WorkerConfig::default())?;

    worker.send(load("county"))?;
    let Event::LoadFailed { name, error } = worker.recv()? else {
        return Err(anyhow!("load should fail"));
    };
    assert_eq!(name, "county");
    assert!(error.contains("85690002.geojson"), "{error}");

    worker.send(search(QueryId::from(1), 0.5, 0.5))?;
    assert!(matches!(worker.recv()?, Event::NotReady { name: None, .. }));

    worker.send(load("region"))?;
    assert_eq!(
        worker.recv()?,
        Event::Loaded {
            name: "region".to_owned()
        }
    );

    worker.send(load("county"))?;
    assert!(matches!(worker.recv()?, Event::Error { .. }));

    worker.send(search(QueryId::from(2), 1., 1.))?;
    let Event::Results { name, results, .. } = worker.recv()? else {
        return Err(anyhow!("search should be answered"));
    };
    assert_eq!(name, "region");
    assert_eq!(results.get("Id"), Some(&json!(85680001)));
    Ok(())
}

#[test]
fn binary_speaks_json_lines() -> Result<()> {
    let mut child = Process::new(env!("CARGO_BIN_EXE_polyloc-worker"))
        .env("RUST_LOG", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .context("failed to start the worker")?;

    {
        let mut stdin = child.stdin.take().context("no stdin")?;
        stdin.write_all(b"\xff\xfe\n")?;
        writeln!(
            stdin,
            r#"{{"type":"search","id":"q0","coords":{{"lat":5.0,"lon":5.0}}}}"#
        )?;
        let load = json!({ "type": "load", "name": "region", "directory": gazetteer() });
        writeln!(stdin, "{load}")?;
        writeln!(stdin, "this is not a command")?;
        writeln!(stdin)?;
        writeln!(
            stdin,
            r#"{{"type":"search","id":"q1","coords":{{"lat":5.0,"lon":5.0}}}}"#
        )?;
    }

    let stdout = child.stdout.take().context("no stdout")?;
    let events = BufReader::new(stdout)
        .lines()
        .map(|line| Ok(serde_json::from_str::<Value>(&line?)?))
        .collect::<Result<Vec<_>>>()?;
    assert!(child.wait()?.success());

    assert_eq!(events.len(), 5);
    assert_eq!(events[0]["type"], json!("error"));
    assert_eq!(
        events[1],
        json!({ "type": "notReady", "name": null, "id": "q0" })
    );
    assert_eq!(events[2], json!({ "type": "loaded", "name": "region" }));
    assert_eq!(events[3]["type"], json!("error"));
    assert_eq!(events[4]["type"], json!("results"));
    assert_eq!(events[4]["id"], json!("q1"));
    assert_eq!(events[4]["results"]["Id"], json!(85680002));
    Ok(())
}
