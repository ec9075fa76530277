// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use log::*;
use std::collections::{HashMap, HashSet};
use std::io::{self, BufWriter, Write};

use itertools::Itertools;

use crate::graph::call_graph::CSCallGraph;
use crate::ir::call_site::BaseCallSite;
use crate::ir::function::FuncId;
use crate::ir::path::Path;
use crate::pta::context_sensitive::ContextSensitivePTA;
use crate::pta::context_strategy::ContextStrategy;
use crate::pts_set::points_to::PointsToSet;

const SEPARATOR: &str = "##########################################################";
const RULE: &str = "----------------------------------------------------------";

pub struct ContextSensitiveStat<'a, 'pta, 'p, S: ContextStrategy> {
    pta: &'a ContextSensitivePTA<'pta, 'p, S>,
}

impl<'a, 'pta, 'p, S: ContextStrategy<E = BaseCallSite>> ContextSensitiveStat<'a, 'pta, 'p, S> {
    pub fn new(pta: &'a ContextSensitivePTA<'pta, 'p, S>) -> Self {
        ContextSensitiveStat { pta }
    }

    /// Writes the statistics to stdout.
    pub fn dump_stats(&self) -> io::Result<()> {
        let mut stat_writer = BufWriter::new(io::stdout());
        info!("Dumping pta statistics...");
        self.write_stats(&mut stat_writer)?;
        stat_writer.flush()
    }

    pub fn write_stats<W: Write>(&self, stat_writer: &mut W) -> io::Result<()> {
        writeln!(stat_writer, "{}", SEPARATOR)?;
        self.write_call_graph_stat(&self.pta.call_graph, stat_writer)?;
        writeln!(stat_writer, "{}", RULE)?;
        self.write_pts_stat(stat_writer)?;
        writeln!(stat_writer, "{}", SEPARATOR)
    }

    fn write_call_graph_stat<W: Write>(
        &self,
        call_graph: &CSCallGraph,
        stat_writer: &mut W,
    ) -> io::Result<()> {
        let num_cs_reach_funcs = call_graph.reach_funcs().len();
        let ci_reach_funcs: HashSet<FuncId> =
            call_graph.reach_funcs().iter().map(|func| func.func_id).collect();
        let ci_call_edges: HashSet<(BaseCallSite, FuncId)> = call_graph
            .edges()
            .map(|(callsite, _caller, callee)| (callsite.into(), callee.func_id))
            .collect();
        // Functions analysed under more than one context
        let num_cloned_funcs = call_graph
            .reach_funcs()
            .iter()
            .map(|func| func.func_id)
            .counts()
            .values()
            .filter(|count| **count > 1)
            .count();

        writeln!(stat_writer, "Call Graph Statistics: ")?;
        writeln!(stat_writer, "#Reachable functions (CI): {}", ci_reach_funcs.len())?;
        writeln!(stat_writer, "#Reachable functions (CS): {}", num_cs_reach_funcs)?;
        writeln!(stat_writer, "#Functions with several contexts: {}", num_cloned_funcs)?;
        writeln!(stat_writer, "#Call graph edges (CI): {}", ci_call_edges.len())?;
        writeln!(stat_writer, "#Call graph edges (CS): {}", call_graph.num_edges())?;
        writeln!(stat_writer, "#Contexts: {}", self.pta.num_contexts())
    }

    fn write_pts_stat<W: Write>(&self, stat_writer: &mut W) -> io::Result<()> {
        let cs_pts_map = &self.pta.pt_data.propa_pts_map;
        let mut ci_pts_map: HashMap<Path, HashSet<Path>> = HashMap::new();
        let num_cs_pointers = cs_pts_map.len();
        let mut num_cs_pts_relations = 0;
        for (ptr_id, pts) in cs_pts_map {
            num_cs_pts_relations += pts.count();

            let ci_ptr_path = self.pta.pag.node_path(*ptr_id).path;
            let ci_pts = ci_pts_map.entry(ci_ptr_path).or_default();
            for pointee in pts {
                ci_pts.insert(self.pta.pag.node_path(pointee).path);
            }
        }
        let num_ci_pointers = ci_pts_map.len();
        let num_ci_pts_relations: usize = ci_pts_map.values().map(|pts| pts.len()).sum();

        writeln!(stat_writer, "CS Points-to Statistics: ")?;
        writeln!(stat_writer, "#Pointers: {}", num_cs_pointers)?;
        writeln!(stat_writer, "#Points-to relations: {}", num_cs_pts_relations)?;
        writeln!(stat_writer, "#Avg points-to size: {:.2}", average(num_cs_pts_relations, num_cs_pointers))?;

        writeln!(stat_writer, "CI Points-to Statistics: ")?;
        writeln!(stat_writer, "#Pointers: {}", num_ci_pointers)?;
        writeln!(stat_writer, "#Points-to relations: {}", num_ci_pts_relations)?;
        writeln!(stat_writer, "#Avg points-to size: {:.2}", average(num_ci_pts_relations, num_ci_pointers))
    }
}

fn average(total: usize, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}
