//! Anki 2 collection layout: table DDL plus the JSON blobs stored in `col`.
//!
//! Anki keeps note types, decks and options as JSON strings in the single
//! `col` row. Only the keys Anki needs at import time are written here.

use serde_json::{json, Value};
use sha2::{Digest, Sha256};

/// Note-type id shared by every generated deck, so repeated imports update
/// one "AI Study Card" note type instead of cloning it each time.
pub const MODEL_ID: i64 = 1_583_429_017;

pub const MODEL_NAME: &str = "AI Study Card";

/// Field order in `notes.flds`; the first field is the sort field.
pub const FIELD_NAMES: [&str; 4] = ["Front", "Back", "Source", "Created"];

/// Separator between fields in `notes.flds`.
pub const FIELD_SEPARATOR: char = '\x1f';

/// Anki's built-in "Default" deck, always present with id 1.
pub const DEFAULT_DECK_ID: i64 = 1;

pub const SCHEMA_SQL: &str = r#"
CREATE TABLE col (
    id              integer primary key,
    crt             integer not null,
    mod             integer not null,
    scm             integer not null,
    ver             integer not null,
    dty             integer not null,
    usn             integer not null,
    ls              integer not null,
    conf            text not null,
    models          text not null,
    decks           text not null,
    dconf           text not null,
    tags            text not null
);
CREATE TABLE notes (
    id              integer primary key,
    guid            text not null,
    mid             integer not null,
    mod             integer not null,
    usn             integer not null,
    tags            text not null,
    flds            text not null,
    sfld            integer not null,
    csum            integer not null,
    flags           integer not null,
    data            text not null
);
CREATE TABLE cards (
    id              integer primary key,
    nid             integer not null,
    did             integer not null,
    ord             integer not null,
    mod             integer not null,
    usn             integer not null,
    type            integer not null,
    queue           integer not null,
    due             integer not null,
    ivl             integer not null,
    factor          integer not null,
    reps            integer not null,
    lapses          integer not null,
    left            integer not null,
    odue            integer not null,
    odid            integer not null,
    flags           integer not null,
    data            text not null
);
CREATE TABLE revlog (
    id              integer primary key,
    cid             integer not null,
    usn             integer not null,
    ease            integer not null,
    ivl             integer not null,
    lastIvl         integer not null,
    factor          integer not null,
    time            integer not null,
    type            integer not null
);
CREATE TABLE graves (
    usn             integer not null,
    oid             integer not null,
    type            integer not null
);
CREATE INDEX ix_notes_usn on notes (usn);
CREATE INDEX ix_cards_usn on cards (usn);
CREATE INDEX ix_revlog_usn on revlog (usn);
CREATE INDEX ix_cards_nid on cards (nid);
CREATE INDEX ix_cards_sched on cards (did, queue, due);
CREATE INDEX ix_revlog_cid on revlog (cid);
CREATE INDEX ix_notes_csum on notes (csum);
"#;

const FRONT_TEMPLATE: &str = r#"<div class="card-front">
    <div class="question">{{Front}}</div>
    <div class="source">Source: {{Source}}</div>
</div>"#;

const BACK_TEMPLATE: &str = r#"<div class="card-back">
    <div class="question">{{Front}}</div>
    <hr>
    <div class="answer">{{Back}}</div>
    <div class="metadata">
        <div class="source">Source: {{Source}}</div>
        <div class="created">Created: {{Created}}</div>
    </div>
</div>"#;

pub const CARD_CSS: &str = r#".card {
    font-family: "Arial", sans-serif;
    font-size: 16px;
    line-height: 1.5;
    color: #000000;
    background-color: #fafafa;
    padding: 20px;
    border-radius: 8px;
    max-width: 600px;
    margin: 0 auto;
}

.card-front, .card-back {
    text-align: center;
}

.question {
    font-size: 18px;
    font-weight: bold;
    margin-bottom: 20px;
    background-color: #ecf0f1;
    padding: 15px;
    border-radius: 5px;
    border-left: 4px solid #3498db;
}

.answer {
    font-size: 16px;
    margin: 20px 0;
    padding: 15px;
    background-color: #e8f5e8;
    border-radius: 5px;
    border-left: 4px solid #27ae60;
    text-align: left;
}

.source {
    font-size: 12px;
    font-style: italic;
    margin-top: 10px;
}

.metadata {
    margin-top: 20px;
    padding-top: 15px;
    border-top: 1px solid #bdc3c7;
    font-size: 11px;
}

.created {
    margin-top: 5px;
}

hr {
    border: none;
    border-top: 2px solid #ecf0f1;
    margin: 20px 0;
}

ul, ol {
    text-align: left;
    margin: 10px 0;
    padding-left: 20px;
}

li {
    margin: 5px 0;
}

code {
    background-color: #f1f2f6;
    padding: 2px 4px;
    border-radius: 3px;
    font-family: "Courier New", monospace;
}
"#;

/// Deck id derived from the name: stable across runs, in `[2^30, 2^31)`
/// like the ids Anki itself hands out.
pub fn deck_id(name: &str) -> i64 {
    let digest = Sha256::digest(name.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    let n = u64::from_be_bytes(head) % (1 << 30);
    (1i64 << 30) + n as i64
}

/// `col.conf`
pub fn collection_conf(deck_id: i64) -> Value {
    json!({
        "activeDecks": [deck_id],
        "curDeck": deck_id,
        "newSpread": 0,
        "collapseTime": 1200,
        "timeLim": 0,
        "estTimes": true,
        "dueCounts": true,
        "curModel": MODEL_ID.to_string(),
        "nextPos": 1,
        "sortType": "noteFld",
        "sortBackwards": false,
        "addToCur": true
    })
}

/// `col.models`: the single study-card note type.
pub fn models(deck_id: i64, mod_secs: i64) -> Value {
    let fields: Vec<Value> = FIELD_NAMES
        .iter()
        .enumerate()
        .map(|(ord, name)| {
            json!({
                "name": name,
                "ord": ord,
                "sticky": false,
                "rtl": false,
                "font": "Arial",
                "size": 20,
                "media": []
            })
        })
        .collect();

    json!({
        MODEL_ID.to_string(): {
            "id": MODEL_ID,
            "name": MODEL_NAME,
            "type": 0,
            "mod": mod_secs,
            "usn": -1,
            "sortf": 0,
            "did": deck_id,
            "tmpls": [{
                "name": "Card 1",
                "ord": 0,
                "qfmt": FRONT_TEMPLATE,
                "afmt": BACK_TEMPLATE,
                "did": null,
                "bqfmt": "",
                "bafmt": ""
            }],
            "flds": fields,
            "css": CARD_CSS,
            "latexPre": "\\documentclass[12pt]{article}\n\\special{papersize=3in,5in}\n\\usepackage[utf8]{inputenc}\n\\usepackage{amssymb,amsmath}\n\\pagestyle{empty}\n\\setlength{\\parindent}{0in}\n\\begin{document}\n",
            "latexPost": "\\end{document}",
            "tags": [],
            "vers": [],
            "req": [[0, "any", [0]]]
        }
    })
}

fn deck_entry(id: i64, name: &str, desc: &str, mod_secs: i64) -> Value {
    json!({
        "id": id,
        "name": name,
        "desc": desc,
        "mod": mod_secs,
        "usn": -1,
        "collapsed": false,
        "browserCollapsed": false,
        "newToday": [0, 0],
        "revToday": [0, 0],
        "lrnToday": [0, 0],
        "timeToday": [0, 0],
        "dyn": 0,
        "conf": 1,
        "extendNew": 10,
        "extendRev": 50
    })
}

/// `col.decks`: Anki's default deck plus the generated one.
pub fn decks(deck_id: i64, name: &str, description: &str, mod_secs: i64) -> Value {
    json!({
        DEFAULT_DECK_ID.to_string(): deck_entry(DEFAULT_DECK_ID, "Default", "", mod_secs),
        deck_id.to_string(): deck_entry(deck_id, name, description, mod_secs),
    })
}

/// `col.dconf`: the default scheduling options group.
pub fn deck_config(mod_secs: i64) -> Value {
    json!({
        "1": {
            "id": 1,
            "name": "Default",
            "mod": mod_secs,
            "usn": 0,
            "maxTaken": 60,
            "autoplay": true,
            "timer": 0,
            "replayq": true,
            "dyn": false,
            "new": {
                "bury": true,
                "delays": [1, 10],
                "initialFactor": 2500,
                "ints": [1, 4, 7],
                "order": 1,
                "perDay": 20,
                "separate": true
            },
            "rev": {
                "bury": true,
                "ease4": 1.3,
                "fuzz": 0.05,
                "ivlFct": 1,
                "maxIvl": 36500,
                "minSpace": 1,
                "perDay": 100
            },
            "lapse": {
                "delays": [10],
                "leechAction": 0,
                "leechFails": 8,
                "minInt": 1,
                "mult": 0
            }
        }
    })
}
